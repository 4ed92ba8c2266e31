//! Gloam Shadows - roaming night-time hazards
//!
//! Spawning is bit-for-bit reproducible for a given (story, day, map): the
//! seed is FNV-1a of `"{story}|{day}|{map}"`, fed to the kernel LCG, and the
//! draw order is fixed. Drift uses no random state at all;
//! ties are broken by hashing (hazard id, time bucket, destination).

mod config;
mod drift;
mod placement;
mod system;

pub use config::{EncounterTemplates, ShadowConfig};
pub use drift::drift_tiebreak;
pub use placement::spawn_seed;
pub use system::ShadowSystem;
