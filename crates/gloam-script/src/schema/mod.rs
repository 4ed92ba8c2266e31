//! Schema definitions for RON content files

pub mod map;
pub mod story;

pub use map::{MapFile, TileDef};
pub use story::StoryFile;
