//! Error types for gloam-script

use thiserror::Error;

/// Content loading error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Duplicate definition: {0}")]
    DuplicateDefinition(String),

    #[error("Content error: {0}")]
    Content(#[from] gloam_core::Error),

    #[error("Kernel configuration error: {0}")]
    Config(#[from] gloam_hub::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
