//! Gloam Script - RON content loader
//!
//! Loads kernel content from RON files:
//! - Maps drawn as glyph rows with a tile legend
//! - Story progress and persisted story hazards
//! - Kernel configuration

mod error;
mod loader;
mod schema;

pub use error::{Error, Result};
pub use loader::{Content, Loader};
pub use schema::{MapFile, StoryFile, TileDef};
