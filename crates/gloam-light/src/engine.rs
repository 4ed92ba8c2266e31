//! Light field engine
//!
//! Tile light is composed in this order:
//! 1. base light of the tile from map content
//! 2. plus the ambient shift of the current phase, clamped to `[0, 2]`
//! 3. max with the static-source contribution (cached per chunk)
//! 4. max with the dynamic contribution (player lantern and temporary effects)

use crate::cache::ChunkCache;
use crate::config::LightConfig;
use gloam_core::{
    Draft, GameState, Intensity, LightLevel, LightSource, MapData, MapId, MapProvider, Result,
    SimEvent, SourceId, SourceKind,
};
use std::borrow::Cow;
use std::sync::Arc;

/// What the cache was last computed against
#[derive(Debug, Clone, PartialEq, Eq)]
struct Observed {
    map: MapId,
    ambient: i8,
    revision: u64,
}

/// Computes per-tile light levels and maintains the light slice
pub struct LightEngine {
    maps: Arc<dyn MapProvider>,
    config: LightConfig,
    cache: ChunkCache,
    observed: Option<Observed>,
}

impl LightEngine {
    pub fn new(maps: Arc<dyn MapProvider>, config: LightConfig) -> Self {
        let cache = ChunkCache::new(config.chunk_size);
        Self {
            maps,
            config,
            cache,
            observed: None,
        }
    }

    pub fn config(&self) -> &LightConfig {
        &self.config
    }

    /// Number of chunk recomputations so far
    pub fn recompute_count(&self) -> u64 {
        self.cache.recompute_count()
    }

    /// Current (ambient, sources) version counters
    pub fn versions(&self) -> (u64, u64) {
        self.cache.versions()
    }

    pub fn cached_chunks(&self) -> usize {
        self.cache.len()
    }

    /// Drop all cached grids
    ///
    /// Called when a draft is rolled back, since grids computed against the
    /// draft must not be served for the canonical tree.
    pub fn discard_cache(&mut self) {
        self.cache.invalidate();
        self.observed = None;
    }

    // ========================================================================
    // Per-step maintenance
    // ========================================================================

    /// Bring the light slice up to date with the rest of the draft
    ///
    /// Loads static sources when the player is on a new map, applies the
    /// ambient shift of the current phase, drops expired temporary effects
    /// and rebuilds the player lantern. Unknown maps and malformed static
    /// sources are fatal.
    pub fn update(&mut self, draft: &mut Draft) -> Result<()> {
        let map_id = draft.runtime().map_id.clone();
        let map = self.maps.require(&map_id)?;
        let now = draft.time().elapsed_seconds;
        let mut sources_changed = false;
        let mut ambient_changed = false;

        if draft.light().static_map.as_ref() != Some(&map_id) {
            let sources = map.static_sources()?;
            log::debug!("loaded {} static light sources for {}", sources.len(), map_id);
            let light = draft.touch_light();
            light.static_sources = sources;
            light.static_map = Some(map_id.clone());
            sources_changed = true;
        }

        let ambient = draft.time().phase.ambient_shift();
        let previous = draft.light().ambient_shift;
        if previous != ambient {
            draft.touch_light().ambient_shift = ambient;
            draft.emit(SimEvent::AmbientChanged {
                from: previous,
                to: ambient,
            });
            ambient_changed = true;
        }

        if draft.light().temporary.values().any(|s| s.is_expired(now)) {
            draft
                .touch_light()
                .temporary
                .retain(|_, s| !s.is_expired(now));
            sources_changed = true;
        }

        let lantern = self.lantern(draft.state());
        if draft.light().player_source != lantern {
            draft.touch_light().player_source = lantern;
        }

        if sources_changed {
            self.mark_sources_dirty(draft);
        } else if ambient_changed {
            self.cache.invalidate();
        }
        self.observe(draft.state());
        Ok(())
    }

    /// Record that the static or temporary source set changed
    ///
    /// Invalidates the whole cache, stamps the light slice with a fresh
    /// revision and emits `SourceSetChanged`.
    pub fn mark_sources_dirty(&mut self, draft: &mut Draft) {
        self.cache.invalidate();
        let revision = self.cache.sources_version();
        draft.touch_light().revision = revision;
        let map_id = draft.runtime().map_id.clone();
        draft.emit(SimEvent::SourceSetChanged { map_id, revision });
        self.observe(draft.state());
    }

    fn lantern(&self, state: &GameState) -> Option<LightSource> {
        let player = state.player();
        if !player.lantern_lit {
            return None;
        }
        let now = state.time().elapsed_seconds;
        let radius = if player.has_status(&self.config.oil_status, now) {
            self.config.oil_lantern_radius
        } else {
            self.config.lantern_radius
        };
        let runtime = state.runtime();
        Some(LightSource {
            id: SourceId::new("player"),
            kind: SourceKind::Player,
            map_id: runtime.map_id.clone(),
            x: runtime.x,
            y: runtime.y,
            radius,
            intensity: self.config.lantern_intensity,
            active: true,
            expires_at: None,
        })
    }

    fn observe(&mut self, state: &GameState) {
        let current = Observed {
            map: state.runtime().map_id.clone(),
            ambient: state.light().ambient_shift,
            revision: state.light().revision,
        };
        match &self.observed {
            Some(seen) if *seen == current => {}
            Some(_) => {
                self.cache.invalidate();
                self.observed = Some(current);
            }
            None => self.observed = Some(current),
        }
    }

    // ========================================================================
    // Temporary effects
    // ========================================================================

    /// Add or replace a temporary light effect at the player's map
    #[allow(clippy::too_many_arguments)]
    pub fn apply_temporary_light_effect(
        &mut self,
        draft: &mut Draft,
        id: impl Into<SourceId>,
        x: i32,
        y: i32,
        radius: i32,
        intensity: Intensity,
        duration_ms: u64,
    ) {
        let id = id.into();
        let expires_at = draft.time().elapsed_seconds + duration_ms as f64 / 1000.0;
        let source = LightSource {
            id: id.clone(),
            kind: SourceKind::Temporary,
            map_id: draft.runtime().map_id.clone(),
            x,
            y,
            radius: radius.max(0),
            intensity,
            active: true,
            expires_at: Some(expires_at),
        };
        log::debug!("temporary light {} until {:.1}s", id, expires_at);
        draft.touch_light().temporary.insert(id, source);
        self.mark_sources_dirty(draft);
    }

    /// Remove a temporary light effect; returns false if it did not exist
    pub fn remove_temporary_light_effect(&mut self, draft: &mut Draft, id: &SourceId) -> bool {
        if !draft.light().temporary.contains_key(id) {
            return false;
        }
        draft.touch_light().temporary.shift_remove(id);
        self.mark_sources_dirty(draft);
        true
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Light level of a tile on the player's current map
    pub fn tile_light_level(&mut self, state: &GameState, x: i32, y: i32) -> Result<LightLevel> {
        self.tile_light_numeric(state, x, y)
            .map(LightLevel::from_numeric)
    }

    /// Numeric light (0, 1 or 2) of a tile on the player's current map
    pub fn tile_light_numeric(&mut self, state: &GameState, x: i32, y: i32) -> Result<u8> {
        let map = self.maps.require(&state.runtime().map_id)?;
        self.numeric_on(&map, state, x, y)
    }

    /// Light level of a tile on an already resolved map
    pub fn light_on(
        &mut self,
        map: &MapData,
        state: &GameState,
        x: i32,
        y: i32,
    ) -> Result<LightLevel> {
        self.numeric_on(map, state, x, y).map(LightLevel::from_numeric)
    }

    fn numeric_on(&mut self, map: &MapData, state: &GameState, x: i32, y: i32) -> Result<u8> {
        if !map.in_bounds(x, y) {
            return Ok(0);
        }
        self.observe(state);
        let light = state.light();

        let base = map.base_light(x, y) as i16 + light.ambient_shift as i16;
        let mut level = base.clamp(0, 2) as u8;
        if level == 2 {
            return Ok(2);
        }

        let statics: Cow<'_, [LightSource]> = if light.static_map.as_ref() == Some(&map.id) {
            Cow::Borrowed(&light.static_sources)
        } else {
            Cow::Owned(map.static_sources()?)
        };
        level = level.max(self.cache.contribution(map, &statics, x, y));
        if level == 2 {
            return Ok(2);
        }

        Ok(level.max(dynamic_contribution(state, &map.id, x, y)))
    }

    /// Active sources on the player's map whose center lies within `range` of (x, y)
    pub fn light_sources_in_range(
        &self,
        state: &GameState,
        x: i32,
        y: i32,
        range: i32,
    ) -> Vec<LightSource> {
        let light = state.light();
        let map_id = &state.runtime().map_id;
        let r = range.max(0) as i64;
        let now = state.time().elapsed_seconds;
        let statics = light
            .static_sources
            .iter()
            .filter(|_| light.static_map.as_ref() == Some(map_id));
        statics
            .chain(light.temporary.values().filter(|s| !s.is_expired(now)))
            .chain(light.player_source.iter())
            .filter(|s| s.active && &s.map_id == map_id)
            .filter(|s| {
                let dx = (s.x - x) as i64;
                let dy = (s.y - y) as i64;
                dx * dx + dy * dy <= r * r
            })
            .cloned()
            .collect()
    }

    /// Whether (x, y) lies in one of the map's safe zones
    pub fn is_in_safe_zone(&self, map_id: &MapId, x: i32, y: i32) -> Result<bool> {
        Ok(self.maps.require(map_id)?.in_safe_zone(x, y))
    }
}

fn dynamic_contribution(state: &GameState, map_id: &MapId, x: i32, y: i32) -> u8 {
    let light = state.light();
    let now = state.time().elapsed_seconds;
    light
        .player_source
        .iter()
        .chain(light.temporary.values().filter(|s| !s.is_expired(now)))
        .filter(|s| &s.map_id == map_id && s.covers(x, y))
        .map(|s| s.intensity.level().numeric())
        .max()
        .unwrap_or(0)
}

impl std::fmt::Debug for LightEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LightEngine")
            .field("versions", &self.cache.versions())
            .field("cached_chunks", &self.cache.len())
            .field("recomputes", &self.cache.recompute_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gloam_core::{Clock, Error, MapRegistry, Phase, StaticLightDef, TimeConfig};

    fn engine_with(maps: Vec<MapData>) -> LightEngine {
        let mut registry = MapRegistry::new();
        for map in maps {
            registry.insert(map).unwrap();
        }
        LightEngine::new(Arc::new(registry), LightConfig::default())
    }

    fn night_state(map: &str, x: i32, y: i32) -> GameState {
        GameState::new(map, x, y).with_clock(Clock::at_phase(
            &TimeConfig::default(),
            Phase::Night,
            1,
        ))
    }

    fn updated(engine: &mut LightEngine, state: &GameState) -> GameState {
        let mut draft = Draft::new(state);
        engine.update(&mut draft).unwrap();
        draft.into_state()
    }

    #[test]
    fn test_night_lantern_scenario() {
        let mut engine = engine_with(vec![MapData::open("moor", 20, 20, 1)]);
        let state = updated(&mut engine, &night_state("moor", 10, 10));
        assert_eq!(state.light().ambient_shift, -1);

        for y in 0..20 {
            for x in 0..20 {
                let d2 = (x - 10) * (x - 10) + (y - 10) * (y - 10);
                let expected = if d2 <= 4 {
                    LightLevel::Dim
                } else {
                    LightLevel::Dark
                };
                assert_eq!(engine.tile_light_level(&state, x, y).unwrap(), expected);
            }
        }
    }

    #[test]
    fn test_oil_extends_lantern() {
        let mut engine = engine_with(vec![MapData::open("moor", 20, 20, 1)]);
        let mut draft = Draft::new(&night_state("moor", 10, 10));
        draft
            .touch_player()
            .statuses
            .insert("lamp_oil".into(), None);
        engine.update(&mut draft).unwrap();
        let state = draft.into_state();

        assert_eq!(engine.tile_light_level(&state, 13, 10).unwrap(), LightLevel::Dim);
        assert_eq!(engine.tile_light_level(&state, 13, 11).unwrap(), LightLevel::Dark);
    }

    #[test]
    fn test_unlit_lantern() {
        let mut engine = engine_with(vec![MapData::open("moor", 8, 8, 1)]);
        let mut draft = Draft::new(&night_state("moor", 4, 4));
        draft.touch_player().lantern_lit = false;
        engine.update(&mut draft).unwrap();
        assert!(draft.light().player_source.is_none());
        let state = draft.into_state();
        assert_eq!(engine.tile_light_level(&state, 4, 4).unwrap(), LightLevel::Dark);
    }

    #[test]
    fn test_day_ambient_and_clamp() {
        let mut map = MapData::open("field", 8, 8, 1);
        map.set_base_light(0, 0, 2);
        map.set_base_light(1, 0, 0);
        let mut engine = engine_with(vec![map]);
        let state = updated(&mut engine, &GameState::new("field", 7, 7));

        assert_eq!(state.light().ambient_shift, 1);
        assert_eq!(engine.tile_light_numeric(&state, 0, 0).unwrap(), 2);
        assert_eq!(engine.tile_light_numeric(&state, 1, 0).unwrap(), 1);
        assert_eq!(engine.tile_light_numeric(&state, 2, 0).unwrap(), 2);
        assert_eq!(engine.tile_light_numeric(&state, -1, 0).unwrap(), 0);
    }

    #[test]
    fn test_static_source_and_cache_efficiency() {
        let mut map = MapData::open("crypt", 32, 32, 0);
        map.light_sources.push(StaticLightDef {
            id: "brazier".into(),
            x: 20,
            y: 20,
            radius: 2,
            intensity: Intensity::Bright,
            active: true,
        });
        let mut engine = engine_with(vec![map]);
        let mut draft = Draft::new(&night_state("crypt", 2, 2));
        draft.touch_player().lantern_lit = false;
        engine.update(&mut draft).unwrap();
        let state = draft.into_state();
        let before = engine.recompute_count();

        for _ in 0..50 {
            assert_eq!(
                engine.tile_light_level(&state, 20, 21).unwrap(),
                LightLevel::Bright
            );
            assert_eq!(
                engine.tile_light_level(&state, 17, 17).unwrap(),
                LightLevel::Dark
            );
        }
        assert_eq!(engine.recompute_count() - before, 1);
    }

    #[test]
    fn test_oversized_static_radius() {
        let mut map = MapData::open("crypt", 8, 8, 0);
        map.light_sources.push(StaticLightDef {
            id: "sun".into(),
            x: 1,
            y: 1,
            radius: i32::MAX,
            intensity: Intensity::Bright,
            active: true,
        });
        let mut engine = engine_with(vec![map]);
        let state = updated(&mut engine, &night_state("crypt", 4, 4));
        assert_eq!(engine.tile_light_level(&state, 1, 1).unwrap(), LightLevel::Bright);
        assert_eq!(engine.tile_light_level(&state, 7, 7).unwrap(), LightLevel::Bright);
    }

    #[test]
    fn test_phase_change_invalidates() {
        let mut engine = engine_with(vec![MapData::open("moor", 16, 16, 1)]);
        let config = TimeConfig::default();
        let state = updated(&mut engine, &GameState::new("moor", 0, 0));
        engine.tile_light_level(&state, 8, 8).unwrap();
        let versions = engine.versions();

        let mut draft = Draft::new(&state);
        *draft.touch_time() = Clock::at_phase(&config, Phase::Dusk, 1);
        engine.update(&mut draft).unwrap();

        assert!(engine.versions().0 > versions.0);
        assert!(engine.versions().1 > versions.1);
        assert_eq!(engine.cached_chunks(), 0);
        assert!(draft
            .events()
            .contains(&SimEvent::AmbientChanged { from: 1, to: 0 }));
    }

    #[test]
    fn test_temporary_effect_lifecycle() {
        let mut engine = engine_with(vec![MapData::open("moor", 16, 16, 1)]);
        let state = updated(&mut engine, &night_state("moor", 0, 0));

        let mut draft = Draft::new(&state);
        engine.apply_temporary_light_effect(&mut draft, "flare", 8, 8, 1, Intensity::Bright, 5_000);
        assert!(draft
            .events()
            .iter()
            .any(|e| matches!(e, SimEvent::SourceSetChanged { .. })));
        let lit = draft.into_state();
        assert_eq!(engine.tile_light_level(&lit, 8, 9).unwrap(), LightLevel::Bright);

        let mut draft = Draft::new(&lit);
        draft.touch_time().elapsed_seconds += 6.0;
        engine.update(&mut draft).unwrap();
        assert!(draft.light().temporary.is_empty());
        let dark = draft.into_state();
        assert_eq!(engine.tile_light_level(&dark, 8, 9).unwrap(), LightLevel::Dark);
    }

    #[test]
    fn test_remove_temporary_effect() {
        let mut engine = engine_with(vec![MapData::open("moor", 16, 16, 1)]);
        let state = updated(&mut engine, &night_state("moor", 0, 0));
        let mut draft = Draft::new(&state);
        engine.apply_temporary_light_effect(&mut draft, "flare", 8, 8, 1, Intensity::Dim, 5_000);
        assert!(engine.remove_temporary_light_effect(&mut draft, &SourceId::new("flare")));
        assert!(!engine.remove_temporary_light_effect(&mut draft, &SourceId::new("flare")));
    }

    #[test]
    fn test_sources_in_range() {
        let mut map = MapData::open("crypt", 32, 32, 0);
        map.light_sources.push(StaticLightDef {
            id: "far".into(),
            x: 30,
            y: 30,
            radius: 2,
            intensity: Intensity::Bright,
            active: true,
        });
        map.light_sources.push(StaticLightDef {
            id: "near".into(),
            x: 3,
            y: 2,
            radius: 2,
            intensity: Intensity::Bright,
            active: true,
        });
        let mut engine = engine_with(vec![map]);
        let state = updated(&mut engine, &night_state("crypt", 2, 2));

        let ids: Vec<String> = engine
            .light_sources_in_range(&state, 2, 2, 3)
            .into_iter()
            .map(|s| s.id.to_string())
            .collect();
        assert_eq!(ids, vec!["near".to_string(), "player".to_string()]);
    }

    #[test]
    fn test_unknown_map_is_fatal() {
        let mut engine = engine_with(vec![]);
        let mut draft = Draft::new(&GameState::new("void", 0, 0));
        assert_eq!(
            engine.update(&mut draft).unwrap_err(),
            Error::UnknownMap(MapId::new("void"))
        );
    }

    #[test]
    fn test_safe_zone_query() {
        let mut map = MapData::open("town", 16, 16, 1);
        map.safe_zones.push(gloam_core::SafeZone {
            name: "well".into(),
            x: 8,
            y: 8,
            radius: 2,
        });
        let engine = engine_with(vec![map]);
        let town = MapId::new("town");
        assert!(engine.is_in_safe_zone(&town, 9, 9).unwrap());
        assert!(!engine.is_in_safe_zone(&town, 11, 8).unwrap());
        assert!(engine.is_in_safe_zone(&MapId::new("void"), 0, 0).is_err());
    }

    #[test]
    fn test_rollback_discards_cache() {
        let mut engine = engine_with(vec![MapData::open("moor", 16, 16, 1)]);
        let state = updated(&mut engine, &night_state("moor", 0, 0));
        engine.tile_light_level(&state, 8, 8).unwrap();
        assert_eq!(engine.cached_chunks(), 1);
        engine.discard_cache();
        assert_eq!(engine.cached_chunks(), 0);
        engine.tile_light_level(&state, 8, 8).unwrap();
        assert_eq!(engine.cached_chunks(), 1);
    }
}
