//! Notifications raised during a simulation step

use crate::{EncounterContext, HazardId, MapId, Phase};
use serde::{Deserialize, Serialize};

/// The kind of a notification, used for subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    PhaseChanged,
    DayStarted,
    Tick,
    AmbientChanged,
    SourceSetChanged,
    EncounterRequested,
    HazardDissolved,
}

/// Request for the encounter system to start an encounter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterRequest {
    pub template_id: String,
    pub context: EncounterContext,
}

/// A notification raised inside a draft
///
/// Events are buffered in the draft and only delivered once the step that
/// raised them has committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    PhaseChanged { from: Phase, to: Phase, day: u32 },
    DayStarted { day: u32 },
    /// Periodic tick at an absolute simulated time
    Tick { at_seconds: f64 },
    AmbientChanged { from: i8, to: i8 },
    SourceSetChanged { map_id: MapId, revision: u64 },
    EncounterRequested(EncounterRequest),
    HazardDissolved { id: HazardId },
}

impl SimEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SimEvent::PhaseChanged { .. } => EventKind::PhaseChanged,
            SimEvent::DayStarted { .. } => EventKind::DayStarted,
            SimEvent::Tick { .. } => EventKind::Tick,
            SimEvent::AmbientChanged { .. } => EventKind::AmbientChanged,
            SimEvent::SourceSetChanged { .. } => EventKind::SourceSetChanged,
            SimEvent::EncounterRequested(_) => EventKind::EncounterRequested,
            SimEvent::HazardDissolved { .. } => EventKind::HazardDissolved,
        }
    }

    /// The phase that started, if this is a phase change
    pub fn phase_started(&self) -> Option<Phase> {
        match self {
            SimEvent::PhaseChanged { to, .. } => Some(*to),
            _ => None,
        }
    }
}
