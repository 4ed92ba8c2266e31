//! Gloam Hub - transactions and step orchestration
//!
//! This crate owns the canonical state of the gloam kernel and is the only
//! place it changes.
//!
//! ## Architecture
//!
//! ```text
//! Hub
//!  ├── Store ── canonical GameState, one open Transaction at a time
//!  │    └── Validator (repairs at commit; strict or lenient)
//!  ├── Systems
//!  │    ├── TimeScheduler
//!  │    ├── LightEngine
//!  │    └── ShadowSystem
//!  ├── EventBus ── receives events of committed transactions only
//!  └── Journal
//! ```
//!
//! ## Example
//!
//! ```
//! use gloam_core::{GameState, MapData, MapRegistry};
//! use gloam_hub::{Hub, KernelConfig};
//! use std::sync::Arc;
//!
//! let mut maps = MapRegistry::new();
//! maps.insert(MapData::open("field", 16, 16, 1)).unwrap();
//!
//! let mut hub = Hub::new(
//!     GameState::new("field", 4, 4),
//!     Arc::new(maps),
//!     KernelConfig::default(),
//! )
//! .unwrap();
//!
//! let report = hub.step(16.0).unwrap();
//! assert_eq!(report.version, 1);
//! assert_eq!(hub.state().time().elapsed_seconds, 0.016);
//! ```

mod config;
mod error;
mod hub;
mod journal;
mod store;
mod validate;

pub use config::KernelConfig;
pub use error::{Error, Result};
pub use hub::{Hub, Systems};
pub use journal::{Journal, JournalConfig, JournalEntry, JournalStats};
pub use store::{CommitReport, Store, Transaction, TxId};
pub use validate::{Issue, ValidationMode, Validator};
