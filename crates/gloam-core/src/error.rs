//! Error types for gloam-core

use crate::MapId;
use thiserror::Error;

/// Core error type
///
/// Every variant here is a content or data bug. These are raised immediately
/// and are never repaired at runtime.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Unknown map: {0}")]
    UnknownMap(MapId),

    #[error("Invalid light source {id} on map {map}: {reason}")]
    InvalidLightSource {
        map: MapId,
        id: String,
        reason: String,
    },

    #[error("Invalid hazard spawn configuration on map {map}: {reason}")]
    InvalidSpawnConfig { map: MapId, reason: String },

    #[error("Invalid map data for {map}: {reason}")]
    InvalidMap { map: MapId, reason: String },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
