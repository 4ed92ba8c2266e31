//! Hub - runs simulation steps against the store
//!
//! Each public operation is one transaction. A step runs its subsystems in a
//! fixed order inside that transaction:
//!
//! ```text
//! begin
//!  ├── TimeScheduler::update      (clock, phase/day/tick events)
//!  ├── LightEngine::update        (ambient, sources, lantern)
//!  ├── ShadowSystem::handle_phase_start, per phase entered this step
//!  ├── ShadowSystem::update       (story sync, spawn, drift, contact, encounters)
//! commit ──► events published on the bus
//! ```
//!
//! If anything fails the transaction is rolled back, the light cache is
//! discarded and the failure is journaled; the step has no effect.

use crate::config::KernelConfig;
use crate::journal::Journal;
use crate::store::{CommitReport, Store, Transaction};
use crate::validate::Validator;
use crate::{Error, Result};
use gloam_core::{
    Draft, EventBus, EventKind, GameState, HazardId, Intensity, LightLevel, MapProvider,
    ModeClassifier, Phase, SimEvent, SourceId, TimeScheduler,
};
use gloam_light::LightEngine;
use gloam_shadows::ShadowSystem;
use std::sync::Arc;

/// The subsystems a transaction body may drive
pub struct Systems {
    pub time: TimeScheduler,
    pub light: LightEngine,
    pub shadows: ShadowSystem,
    pub modes: Box<dyn ModeClassifier>,
}

impl Systems {
    /// Advance the clock with `advance`, then bring light and hazards up to date
    fn simulate(
        &mut self,
        draft: &mut Draft,
        advance: impl FnOnce(&TimeScheduler, &mut Draft, &dyn ModeClassifier),
    ) -> Result<()> {
        let before = draft.time().elapsed_seconds;
        advance(&self.time, draft, self.modes.as_ref());
        self.light.update(draft)?;

        let entered: Vec<Phase> = draft
            .events()
            .iter()
            .filter_map(SimEvent::phase_started)
            .collect();
        for phase in entered {
            self.shadows.handle_phase_start(phase, draft, &mut self.light)?;
        }

        let clock = draft.time();
        let dt_ms = ((clock.elapsed_seconds - before) * 1000.0).max(0.0);
        let now_ms = clock.elapsed_ms();
        self.shadows.update(draft, &mut self.light, now_ms, dt_ms)?;
        Ok(())
    }
}

/// Owner of the canonical state and every subsystem acting on it
pub struct Hub {
    store: Store,
    systems: Systems,
    bus: EventBus,
    journal: Journal,
    config: KernelConfig,
}

impl Hub {
    /// Create a hub over `state` with maps from `maps`
    ///
    /// Fails if the configuration does not validate.
    pub fn new(state: GameState, maps: Arc<dyn MapProvider>, config: KernelConfig) -> Result<Self> {
        config.validate()?;
        let systems = Systems {
            time: TimeScheduler::new(config.time.clone()),
            light: LightEngine::new(maps.clone(), config.light.clone()),
            shadows: ShadowSystem::new(maps, config.shadows.clone()),
            modes: Box::new(config.paused_modes.clone()),
        };
        Ok(Self {
            store: Store::new(state, Validator::new(config.validation, config.time.clone())),
            systems,
            bus: EventBus::new(),
            journal: Journal::with_config(config.journal.clone()),
            config,
        })
    }

    /// Replace the mode classifier
    pub fn with_modes(mut self, modes: impl ModeClassifier + 'static) -> Self {
        self.systems.modes = Box::new(modes);
        self
    }

    /// The canonical state
    pub fn state(&self) -> &GameState {
        self.store.state()
    }

    /// Number of committed transactions
    pub fn version(&self) -> u64 {
        self.store.version()
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn light(&self) -> &LightEngine {
        &self.systems.light
    }

    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    /// Subscribe to one kind of event
    pub fn subscribe(&mut self, kind: EventKind, f: impl FnMut(&SimEvent) + 'static) {
        self.bus.subscribe(kind, f);
    }

    // ========================================================================
    // Steps
    // ========================================================================

    /// Run one simulation step covering `elapsed_ms` of wall time
    pub fn step(&mut self, elapsed_ms: f64) -> Result<CommitReport> {
        self.run("step", |systems, draft| {
            systems.simulate(draft, |time, draft, modes| {
                time.update(elapsed_ms, draft, modes)
            })
        })
        .map(|(_, report)| report)
    }

    /// Jump the clock forward, ignoring pause, and run the rest of a step
    pub fn debug_skip_seconds(&mut self, seconds: f64) -> Result<CommitReport> {
        self.run("debug skip", |systems, draft| {
            systems.simulate(draft, |time, draft, _| {
                time.debug_skip_seconds(seconds, draft)
            })
        })
        .map(|(_, report)| report)
    }

    /// Run `body` in its own transaction
    ///
    /// Light is refreshed before commit so lantern and map changes made by
    /// `body` are visible to queries immediately.
    pub fn transact<T>(
        &mut self,
        reason: &str,
        body: impl FnOnce(&mut Draft) -> Result<T>,
    ) -> Result<T> {
        self.run(reason, |systems, draft| {
            let value = body(draft)?;
            systems.light.update(draft)?;
            Ok(value)
        })
        .map(|(value, _)| value)
    }

    // ========================================================================
    // Collaborator entry points
    // ========================================================================

    pub fn apply_temporary_light_effect(
        &mut self,
        id: impl Into<SourceId>,
        x: i32,
        y: i32,
        radius: i32,
        intensity: Intensity,
        duration_ms: u64,
    ) -> Result<()> {
        let id = id.into();
        self.run("light effect", |systems, draft| {
            systems
                .light
                .apply_temporary_light_effect(draft, id, x, y, radius, intensity, duration_ms);
            Ok(())
        })
        .map(|_| ())
    }

    pub fn remove_temporary_light_effect(&mut self, id: &SourceId) -> Result<bool> {
        self.run("light effect removal", |systems, draft| {
            Ok(systems.light.remove_temporary_light_effect(draft, id))
        })
        .map(|(removed, _)| removed)
    }

    /// Remove a hazard, by default the one from the last encounter
    pub fn dissolve_hazard(&mut self, id: Option<&HazardId>) -> Result<Option<HazardId>> {
        self.run("dissolve", |systems, draft| {
            Ok(systems.shadows.dissolve(draft, id))
        })
        .map(|(dissolved, _)| dissolved)
    }

    /// Light level of a tile on the player's map in the canonical state
    pub fn tile_light_level(&mut self, x: i32, y: i32) -> Result<LightLevel> {
        Ok(self
            .systems
            .light
            .tile_light_level(self.store.state(), x, y)?)
    }

    /// Whether (x, y) on the player's map lies in a safe zone
    pub fn is_in_safe_zone(&self, x: i32, y: i32) -> Result<bool> {
        let map_id = &self.store.state().runtime().map_id;
        Ok(self.systems.light.is_in_safe_zone(map_id, x, y)?)
    }

    // ========================================================================
    // Transaction plumbing
    // ========================================================================

    fn run<T>(
        &mut self,
        reason: &str,
        body: impl FnOnce(&mut Systems, &mut Draft) -> Result<T>,
    ) -> Result<(T, CommitReport)> {
        let mut tx = self.store.begin(reason)?;
        let value = match body(&mut self.systems, &mut *tx) {
            Ok(value) => value,
            Err(error) => {
                self.abort(tx, &error);
                return Err(error);
            }
        };
        match self.store.commit(&mut tx) {
            Ok(report) => {
                self.journal.record_commit(reason, &report);
                self.bus.publish_all(&report.events);
                Ok((value, report))
            }
            Err(error) => {
                self.abort(tx, &error);
                Err(error)
            }
        }
    }

    fn abort(&mut self, tx: Transaction, error: &Error) {
        log::warn!("{} failed, rolling back: {}", tx.reason(), error);
        self.journal.record_rollback(tx.id(), tx.reason(), error);
        self.store.rollback(tx);
        self.systems.light.discard_cache();
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("version", &self.store.version())
            .field("light", &self.systems.light)
            .field("subscribers", &self.bus.subscriber_count())
            .finish_non_exhaustive()
    }
}
