//! Gloam Core - state tree and clock for the gloam simulation kernel
//!
//! This crate provides the pieces every other gloam crate builds on:
//! - Identifiers (`MapId`, `HazardId`, `SourceId`)
//! - The state tree (`GameState`) and its copy-on-write working copy (`Draft`)
//! - A seeded LCG and FNV-1a hashing for reproducible generation
//! - The day/night clock and its boundary-walking scheduler
//! - Events raised during a step and a typed event bus
//! - Map content types and the `MapProvider` / `ModeClassifier` seams
//!
//! ## Drafts
//!
//! Mutation only ever happens through a draft:
//! ```
//! use gloam_core::{Draft, GameState};
//!
//! let canonical = GameState::new("marsh", 3, 4);
//! let mut draft = Draft::new(&canonical);
//! draft.touch_player().hp -= 1;
//!
//! assert_eq!(canonical.player().hp, 6);
//! assert_eq!(draft.player().hp, 5);
//! ```

mod bus;
mod draft;
mod error;
mod identity;
pub mod map;
mod mode;
mod msg;
mod rng;
pub mod state;
pub mod time;

pub use bus::{EventBus, Subscriber};
pub use draft::Draft;
pub use error::{Error, Result};
pub use identity::{HazardId, MapId, SourceId};
pub use map::{MapData, MapProvider, MapRegistry, SafeZone, SpawnConfig, SpawnZone, StaticLightDef};
pub use mode::{ModeClassifier, PausedModes};
pub use msg::{EncounterRequest, EventKind, SimEvent};
pub use rng::{fnv1a, seed_from_str, unit_hash, SeededRng};
pub use state::{
    EncounterContext, GameState, Hazard, HazardCategory, HazardState, Intensity, LightLevel,
    LightSource, LightState, PlayerState, RecordStatus, RuntimeState, ShadowState, Slice,
    SliceSet, SourceKind, SpawnMark, StoryHazardRecord, StoryState,
};
pub use time::{Clock, Phase, TimeConfig, TimeScheduler};
