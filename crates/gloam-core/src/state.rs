//! The state tree and its slices
//!
//! `GameState` is a tree of six named slices, each behind an `Arc`. Cloning a
//! `GameState` only bumps reference counts; a slice is deep-copied the first
//! time a [`Draft`](crate::Draft) touches it. Nothing outside a draft ever
//! gets mutable access to a slice.

use crate::time::Clock;
use crate::{HazardId, MapId, SourceId};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Three-level tile illumination
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LightLevel {
    Dark,
    Dim,
    Bright,
}

impl LightLevel {
    /// Numeric value used for composition (0, 1 or 2)
    pub fn numeric(self) -> u8 {
        match self {
            LightLevel::Dark => 0,
            LightLevel::Dim => 1,
            LightLevel::Bright => 2,
        }
    }

    /// Convert a numeric value, clamping anything above 2 to `Bright`
    pub fn from_numeric(value: u8) -> Self {
        match value {
            0 => LightLevel::Dark,
            1 => LightLevel::Dim,
            _ => LightLevel::Bright,
        }
    }
}

impl fmt::Display for LightLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LightLevel::Dark => "dark",
            LightLevel::Dim => "dim",
            LightLevel::Bright => "bright",
        };
        f.write_str(s)
    }
}

/// Intensity a light source can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intensity {
    Dim,
    Bright,
}

impl Intensity {
    /// The light level this intensity produces inside the source radius
    pub fn level(self) -> LightLevel {
        match self {
            Intensity::Dim => LightLevel::Dim,
            Intensity::Bright => LightLevel::Bright,
        }
    }
}

/// Where a light source comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// Embedded in map content, loaded once per map
    Static,
    /// The player's lantern, rebuilt every update
    Player,
    /// Added by game logic, removed on expiry
    Temporary,
}

/// A light source placed on a map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightSource {
    pub id: SourceId,
    pub kind: SourceKind,
    pub map_id: MapId,
    pub x: i32,
    pub y: i32,
    pub radius: i32,
    pub intensity: Intensity,
    pub active: bool,
    /// Absolute simulated seconds after which the source is removed
    pub expires_at: Option<f64>,
}

impl LightSource {
    /// Hard circular falloff: full intensity within `radius`, nothing beyond
    pub fn covers(&self, x: i32, y: i32) -> bool {
        if !self.active || self.radius < 0 {
            return false;
        }
        let dx = x as i64 - self.x as i64;
        let dy = y as i64 - self.y as i64;
        let r = self.radius as i64;
        dx * dx + dy * dy <= r * r
    }

    /// Whether the source has expired at `now` (absolute seconds)
    pub fn is_expired(&self, now: f64) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Player stats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub hp: u32,
    pub max_hp: u32,
    pub lantern_lit: bool,
    /// Active status effects, with an optional absolute expiry in seconds
    pub statuses: IndexMap<String, Option<f64>>,
}

impl PlayerState {
    pub fn new(max_hp: u32) -> Self {
        Self {
            hp: max_hp,
            max_hp,
            lantern_lit: true,
            statuses: IndexMap::new(),
        }
    }

    /// Apply a hit and return the hp actually lost
    ///
    /// A hit at full health that would otherwise kill leaves the player at 1.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let before = self.hp;
        if self.hp == self.max_hp && amount >= self.max_hp && self.max_hp > 0 {
            self.hp = 1;
        } else {
            self.hp = self.hp.saturating_sub(amount);
        }
        before - self.hp
    }

    /// Whether a status is active at `now` (absolute seconds)
    pub fn has_status(&self, status: &str, now: f64) -> bool {
        match self.statuses.get(status) {
            Some(None) => true,
            Some(Some(expires_at)) => now < *expires_at,
            None => false,
        }
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::new(6)
    }
}

/// Map and position of the player, plus the current game mode label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeState {
    pub map_id: MapId,
    pub x: i32,
    pub y: i32,
    pub mode: String,
}

impl RuntimeState {
    pub fn new(map_id: impl Into<MapId>, x: i32, y: i32) -> Self {
        Self {
            map_id: map_id.into(),
            x,
            y,
            mode: "explore".to_string(),
        }
    }
}

/// Light sources known to the kernel
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LightState {
    /// Ambient delta from the time of day (-1, 0 or +1)
    pub ambient_shift: i8,
    /// Map the static sources were loaded for
    pub static_map: Option<MapId>,
    pub static_sources: Vec<LightSource>,
    pub temporary: IndexMap<SourceId, LightSource>,
    pub player_source: Option<LightSource>,
    /// Bumped whenever the static or temporary source set changes
    pub revision: u64,
}

/// Hazard affiliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HazardCategory {
    /// Spawned and despawned by the hazard system
    Environmental,
    /// Materialized from persisted story records
    Story,
}

/// Behavioral state label of a hazard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HazardState {
    Spawned,
    Drifting,
    /// Triggered an encounter and is cooling down
    Triggered,
}

/// A roaming hazard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hazard {
    pub id: HazardId,
    pub category: HazardCategory,
    pub x: i32,
    pub y: i32,
    pub state: HazardState,
    pub anchor: Option<(i32, i32)>,
    /// Absolute simulated ms before which no new encounter may start
    pub cooldown_until_ms: u64,
}

impl Hazard {
    pub fn new(id: impl Into<HazardId>, category: HazardCategory, x: i32, y: i32) -> Self {
        Self {
            id: id.into(),
            category,
            x,
            y,
            state: HazardState::Spawned,
            anchor: None,
            cooldown_until_ms: 0,
        }
    }

    pub fn manhattan_to(&self, x: i32, y: i32) -> i32 {
        (self.x - x).abs() + (self.y - y).abs()
    }
}

/// Context recorded when a hazard starts an encounter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterContext {
    pub hazard_id: HazardId,
    pub category: HazardCategory,
    pub light: LightLevel,
    pub map_id: MapId,
}

/// The (map, day) an environmental population was spawned for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnMark {
    pub map_id: MapId,
    pub day: u32,
}

/// Active hazards and the bookkeeping of the hazard system
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShadowState {
    pub environmental: Vec<Hazard>,
    pub story: Vec<Hazard>,
    pub next_serial: u64,
    pub drift_accumulator_ms: f64,
    pub last_encounter_check_ms: Option<u64>,
    pub last_encounter: Option<EncounterContext>,
    pub spawned_for: Option<SpawnMark>,
    /// Story hazards dissolved tonight; kept out of the story list until
    /// dawn or until their record stops being live
    #[serde(default)]
    pub dissolved: Vec<HazardId>,
}

impl ShadowState {
    /// All active hazards, environmental first
    pub fn iter(&self) -> impl Iterator<Item = &Hazard> {
        self.environmental.iter().chain(self.story.iter())
    }

    pub fn find(&self, id: &HazardId) -> Option<&Hazard> {
        self.iter().find(|h| &h.id == id)
    }
}

/// Lifecycle of a persisted story hazard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordStatus {
    Active,
    Inactive,
    Resolved,
}

/// A story hazard as persisted by the story system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryHazardRecord {
    pub id: HazardId,
    pub map_id: MapId,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub anchor: Option<(i32, i32)>,
    pub status: RecordStatus,
    #[serde(default)]
    pub required_flags: Vec<String>,
    #[serde(default)]
    pub min_stage: u32,
    #[serde(default)]
    pub max_stage: Option<u32>,
}

impl StoryHazardRecord {
    /// Whether the record should be materialized on `map_id` given the story progress
    pub fn is_live(&self, map_id: &MapId, story: &StoryState) -> bool {
        self.status == RecordStatus::Active
            && &self.map_id == map_id
            && self.required_flags.iter().all(|f| story.flags.contains(f))
            && story.stage >= self.min_stage
            && self.max_stage.map_or(true, |max| story.stage <= max)
    }
}

/// Story progress and persisted story hazards
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StoryState {
    pub story_id: String,
    pub stage: u32,
    pub flags: IndexSet<String>,
    pub hazard_records: Vec<StoryHazardRecord>,
}

/// Named top-level subtrees of the state tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slice {
    Player,
    Runtime,
    Time,
    Light,
    Shadows,
    Story,
}

impl Slice {
    pub const ALL: [Slice; 6] = [
        Slice::Player,
        Slice::Runtime,
        Slice::Time,
        Slice::Light,
        Slice::Shadows,
        Slice::Story,
    ];

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// A set of slices, stored as a bitmask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SliceSet(u8);

impl SliceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a slice; returns true if it was not already present
    pub fn insert(&mut self, slice: Slice) -> bool {
        let fresh = !self.contains(slice);
        self.0 |= slice.bit();
        fresh
    }

    pub fn contains(&self, slice: Slice) -> bool {
        self.0 & slice.bit() != 0
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Slice> + '_ {
        Slice::ALL.into_iter().filter(|s| self.contains(*s))
    }
}

/// The complete simulation state
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub(crate) player: Arc<PlayerState>,
    pub(crate) runtime: Arc<RuntimeState>,
    pub(crate) time: Arc<Clock>,
    pub(crate) light: Arc<LightState>,
    pub(crate) shadows: Arc<ShadowState>,
    pub(crate) story: Arc<StoryState>,
}

impl GameState {
    /// Create a fresh state with the player standing on `map_id` at (x, y)
    pub fn new(map_id: impl Into<MapId>, x: i32, y: i32) -> Self {
        Self {
            player: Arc::new(PlayerState::default()),
            runtime: Arc::new(RuntimeState::new(map_id, x, y)),
            time: Arc::new(Clock::default()),
            light: Arc::new(LightState::default()),
            shadows: Arc::new(ShadowState::default()),
            story: Arc::new(StoryState::default()),
        }
    }

    pub fn with_player(mut self, player: PlayerState) -> Self {
        self.player = Arc::new(player);
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.time = Arc::new(clock);
        self
    }

    pub fn with_story(mut self, story: StoryState) -> Self {
        self.story = Arc::new(story);
        self
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.runtime).mode = mode.into();
        self
    }

    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    pub fn runtime(&self) -> &RuntimeState {
        &self.runtime
    }

    pub fn time(&self) -> &Clock {
        &self.time
    }

    pub fn light(&self) -> &LightState {
        &self.light
    }

    pub fn shadows(&self) -> &ShadowState {
        &self.shadows
    }

    pub fn story(&self) -> &StoryState {
        &self.story
    }

    /// Whether `slice` is the same allocation in both trees
    pub fn shares_slice(&self, other: &GameState, slice: Slice) -> bool {
        match slice {
            Slice::Player => Arc::ptr_eq(&self.player, &other.player),
            Slice::Runtime => Arc::ptr_eq(&self.runtime, &other.runtime),
            Slice::Time => Arc::ptr_eq(&self.time, &other.time),
            Slice::Light => Arc::ptr_eq(&self.light, &other.light),
            Slice::Shadows => Arc::ptr_eq(&self.shadows, &other.shadows),
            Slice::Story => Arc::ptr_eq(&self.story, &other.story),
        }
    }
}
