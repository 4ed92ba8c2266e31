//! Gloam Light - tile illumination for the gloam kernel
//!
//! Every tile reads as DARK, DIM or BRIGHT. Static sources embedded in map
//! content are rasterized once per 16×16 chunk and cached; the player lantern
//! and temporary effects move every frame and are evaluated per query.
//!
//! The cache is invalidated coarsely: a phase change or any change to the
//! source set bumps both version counters and clears every chunk.
//!
//! ```
//! use gloam_core::{Draft, GameState, MapData, MapRegistry, LightLevel};
//! use gloam_light::{LightConfig, LightEngine};
//! use std::sync::Arc;
//!
//! let mut maps = MapRegistry::new();
//! maps.insert(MapData::open("field", 8, 8, 1)).unwrap();
//! let mut engine = LightEngine::new(Arc::new(maps), LightConfig::default());
//!
//! let mut draft = Draft::new(&GameState::new("field", 0, 0));
//! engine.update(&mut draft).unwrap();
//! let state = draft.into_state();
//! assert_eq!(engine.tile_light_level(&state, 5, 5).unwrap(), LightLevel::Bright);
//! ```

mod cache;
mod config;
mod engine;

pub use cache::ChunkCache;
pub use config::LightConfig;
pub use engine::LightEngine;
