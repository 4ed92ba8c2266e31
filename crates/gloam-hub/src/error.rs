//! Error types for gloam-hub

use crate::store::TxId;
use crate::validate::Issue;
use thiserror::Error;

/// Result type for gloam-hub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in gloam-hub
#[derive(Debug, Error)]
pub enum Error {
    /// `begin` was called while another transaction is still open
    #[error("transaction {open:?} is still open")]
    TransactionOpen { open: TxId },

    /// The transaction is not the one currently open in this store
    #[error("transaction {0:?} is not open in this store")]
    StaleTransaction(TxId),

    /// Strict validation found correctable violations
    ///
    /// The issues have already been repaired in the draft, but the canonical
    /// tree was left untouched. The caller must still roll back.
    #[error("invariant violations: {}", Self::format_issues(.0))]
    Invariants(Vec<Issue>),

    /// Kernel configuration failed validation
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Configuration text could not be parsed
    #[error("configuration parse error: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),

    /// Core error
    #[error("core error: {0}")]
    Core(#[from] gloam_core::Error),
}

impl Error {
    /// Get the repaired issues if this is an Invariants error
    pub fn issues(&self) -> Option<&[Issue]> {
        match self {
            Error::Invariants(issues) => Some(issues),
            _ => None,
        }
    }

    fn format_issues(issues: &[Issue]) -> String {
        issues
            .iter()
            .map(|issue| issue.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

// Compile-time check that Error is Send + Sync.
fn _assert_error_send_sync<T: Send + Sync>() {}
fn _error_is_send_sync() {
    _assert_error_send_sync::<Error>();
}
