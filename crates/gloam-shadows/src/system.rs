//! Hazard population system
//!
//! Environmental hazards are spawned at the start of each night from a seed
//! derived from (story, day, map), drift toward dim tiles every drift
//! interval, and are removed at dawn or when the player leaves the map. Story
//! hazards are rebuilt from persisted records on every update and only drift,
//! contact and trigger encounters here.

use crate::config::ShadowConfig;
use crate::drift::choose_move;
use crate::placement::{plan_clusters, spawn_seed, Terrain};
use gloam_core::{
    Draft, EncounterContext, EncounterRequest, Hazard, HazardCategory, HazardId, HazardState,
    LightLevel, MapData, MapProvider, Phase, Result, SeededRng, ShadowState, SimEvent, SpawnMark,
};
use gloam_light::LightEngine;
use std::sync::Arc;

pub struct ShadowSystem {
    maps: Arc<dyn MapProvider>,
    config: ShadowConfig,
}

impl ShadowSystem {
    pub fn new(maps: Arc<dyn MapProvider>, config: ShadowConfig) -> Self {
        Self { maps, config }
    }

    pub fn config(&self) -> &ShadowConfig {
        &self.config
    }

    /// React to a phase boundary crossed during the current step
    pub fn handle_phase_start(
        &self,
        phase: Phase,
        draft: &mut Draft,
        light: &mut LightEngine,
    ) -> Result<()> {
        match phase {
            Phase::Night => {
                self.spawn(draft, light)?;
            }
            Phase::Dawn => {
                self.clear_environmental(draft, "dawn");
                if !draft.shadows().dissolved.is_empty() {
                    draft.touch_shadows().dissolved.clear();
                }
            }
            Phase::Day | Phase::Dusk => {}
        }
        Ok(())
    }

    /// Per-step update at absolute time `now_ms`, `dt_ms` after the previous one
    ///
    /// Story hazards are synced even while time is paused. Everything else
    /// waits for the clock to move: a paused step with `dt_ms > 0` (a debug
    /// skip) runs in full.
    pub fn update(
        &self,
        draft: &mut Draft,
        light: &mut LightEngine,
        now_ms: u64,
        dt_ms: f64,
    ) -> Result<()> {
        self.sync_story_hazards(draft);
        if draft.time().paused && !(dt_ms > 0.0) {
            return Ok(());
        }

        let map = self.maps.require(&draft.runtime().map_id)?;
        let left_map = draft
            .shadows()
            .spawned_for
            .as_ref()
            .is_some_and(|mark| mark.map_id != map.id);
        if left_map {
            self.clear_environmental(draft, "map change");
            draft.touch_shadows().spawned_for = None;
        }

        if draft.time().phase == Phase::Night && draft.shadows().environmental.is_empty() {
            self.spawn(draft, light)?;
        }

        self.release_cooldowns(draft, now_ms);
        self.drift(draft, light, &map, now_ms, dt_ms)?;
        self.apply_contact(draft, &map);
        self.check_encounters(draft, light, &map, now_ms)
    }

    /// Remove a hazard from both active lists
    ///
    /// Defaults to the hazard of the last encounter. Returns the id removed.
    /// A dissolved story hazard stays gone until dawn even though its record
    /// is still active.
    pub fn dissolve(&self, draft: &mut Draft, id: Option<&HazardId>) -> Option<HazardId> {
        let target = match id {
            Some(id) => id.clone(),
            None => draft.shadows().last_encounter.as_ref()?.hazard_id.clone(),
        };
        draft.shadows().find(&target)?;

        let shadows = draft.touch_shadows();
        shadows.environmental.retain(|h| h.id != target);
        let before = shadows.story.len();
        shadows.story.retain(|h| h.id != target);
        if shadows.story.len() != before && !shadows.dissolved.contains(&target) {
            shadows.dissolved.push(target.clone());
        }
        log::debug!("dissolved hazard {}", target);
        draft.emit(SimEvent::HazardDissolved { id: target.clone() });
        Some(target)
    }

    // ========================================================================
    // Spawn
    // ========================================================================

    /// Populate the current map for tonight; returns the number of hazards added
    ///
    /// Runs at most once per (map, day).
    pub fn spawn(&self, draft: &mut Draft, light: &mut LightEngine) -> Result<usize> {
        let map_id = draft.runtime().map_id.clone();
        let map = self.maps.require(&map_id)?;
        let day = draft.time().day;
        let mark = SpawnMark {
            map_id: map_id.clone(),
            day,
        };
        if draft.shadows().spawned_for.as_ref() == Some(&mark) {
            return Ok(0);
        }

        let placements = match &map.hazard_spawn {
            Some(spawn) => {
                let seed = spawn_seed(&draft.story().story_id, day, &map_id);
                let mut rng = SeededRng::new(seed);
                let terrain = Terrain::new(&map, draft.state(), self.config.min_player_distance);
                plan_clusters(
                    &mut rng,
                    spawn,
                    &terrain,
                    light,
                    draft.shadows().environmental.len(),
                    self.config.attempts_per_slot,
                    self.config.placements_per_member,
                )?
            }
            None => Vec::new(),
        };

        let shadows = draft.touch_shadows();
        for p in &placements {
            let id = format!("shade-{}", shadows.next_serial);
            shadows.next_serial += 1;
            let mut hazard = Hazard::new(id, HazardCategory::Environmental, p.x, p.y);
            hazard.anchor = Some(p.anchor);
            shadows.environmental.push(hazard);
        }
        shadows.spawned_for = Some(mark);
        log::info!(
            "spawned {} hazards on {} for day {}",
            placements.len(),
            map_id,
            day
        );
        Ok(placements.len())
    }

    fn clear_environmental(&self, draft: &mut Draft, reason: &str) {
        if draft.shadows().environmental.is_empty() {
            return;
        }
        let shadows = draft.touch_shadows();
        log::debug!(
            "despawning {} hazards ({})",
            shadows.environmental.len(),
            reason
        );
        shadows.environmental.clear();
    }

    // ========================================================================
    // Story hazards
    // ========================================================================

    /// Rebuild the story list from records that are live on the current map
    ///
    /// Position, state and cooldown carry over for hazards that stay live.
    /// Dissolved ids are skipped, and forgotten once their record is no
    /// longer live.
    fn sync_story_hazards(&self, draft: &mut Draft) {
        let map_id = &draft.runtime().map_id;
        let story = draft.story();
        let shadows = draft.shadows();
        let current = &shadows.story;
        let live = |id: &HazardId| {
            story
                .hazard_records
                .iter()
                .any(|record| &record.id == id && record.is_live(map_id, story))
        };
        let dissolved: Vec<HazardId> = shadows
            .dissolved
            .iter()
            .filter(|id| live(*id))
            .cloned()
            .collect();
        let rebuilt: Vec<Hazard> = story
            .hazard_records
            .iter()
            .filter(|record| record.is_live(map_id, story))
            .filter(|record| !dissolved.contains(&record.id))
            .map(|record| {
                let mut hazard = current
                    .iter()
                    .find(|h| h.id == record.id)
                    .cloned()
                    .unwrap_or_else(|| {
                        Hazard::new(record.id.clone(), HazardCategory::Story, record.x, record.y)
                    });
                hazard.anchor = record.anchor;
                hazard
            })
            .collect();
        let dissolved_changed = dissolved != shadows.dissolved;
        if rebuilt != *current {
            draft.touch_shadows().story = rebuilt;
        }
        if dissolved_changed {
            draft.touch_shadows().dissolved = dissolved;
        }
    }

    // ========================================================================
    // Drift
    // ========================================================================

    fn drift(
        &self,
        draft: &mut Draft,
        light: &mut LightEngine,
        map: &MapData,
        now_ms: u64,
        dt_ms: f64,
    ) -> Result<()> {
        let interval = self.config.drift_interval_ms;
        let before = draft.shadows().drift_accumulator_ms;
        let mut acc = before + dt_ms.max(0.0);
        let mut steps = 0;
        while acc >= interval && steps < self.config.max_drift_steps {
            acc -= interval;
            steps += 1;
            let bucket = ((now_ms as f64 - acc) / interval).floor().max(0.0) as u64;
            self.drift_step(draft, light, map, bucket)?;
        }
        if acc >= interval {
            log::debug!("dropping {:.0} ms of drift backlog", acc - acc % interval);
            acc %= interval;
        }
        if acc != before {
            draft.touch_shadows().drift_accumulator_ms = acc;
        }
        Ok(())
    }

    fn drift_step(
        &self,
        draft: &mut Draft,
        light: &mut LightEngine,
        map: &MapData,
        bucket: u64,
    ) -> Result<()> {
        let mut moves = Vec::new();
        {
            let terrain = Terrain::new(map, draft.state(), self.config.min_player_distance);
            for (index, hazard) in draft.shadows().iter().enumerate() {
                if let Some(dest) = choose_move(hazard, &terrain, light, bucket)? {
                    if dest != (hazard.x, hazard.y) {
                        moves.push((index, dest));
                    }
                }
            }
        }

        let settling = draft
            .shadows()
            .iter()
            .any(|h| h.state == HazardState::Spawned);
        if moves.is_empty() && !settling {
            return Ok(());
        }

        let shadows = draft.touch_shadows();
        let environmental = shadows.environmental.len();
        for (index, (x, y)) in moves {
            let hazard = if index < environmental {
                &mut shadows.environmental[index]
            } else {
                &mut shadows.story[index - environmental]
            };
            hazard.x = x;
            hazard.y = y;
        }
        for hazard in hazards_mut(shadows) {
            if hazard.state == HazardState::Spawned {
                hazard.state = HazardState::Drifting;
            }
        }
        Ok(())
    }

    fn release_cooldowns(&self, draft: &mut Draft, now_ms: u64) {
        let cooled =
            |h: &Hazard| h.state == HazardState::Triggered && now_ms >= h.cooldown_until_ms;
        if !draft.shadows().iter().any(cooled) {
            return;
        }
        for hazard in hazards_mut(draft.touch_shadows()) {
            if cooled(&*hazard) {
                hazard.state = HazardState::Drifting;
            }
        }
    }

    // ========================================================================
    // Contact and encounters
    // ========================================================================

    /// Damage the player if a hazard stands on their tile and push them back along X
    fn apply_contact(&self, draft: &mut Draft, map: &MapData) {
        let (px, py) = (draft.runtime().x, draft.runtime().y);
        if map.in_safe_zone(px, py) {
            return;
        }
        let touching = draft.shadows().iter().find(|h| h.x == px && h.y == py);
        let Some(hazard) = touching.map(|h| h.id.clone()) else {
            return;
        };

        let lost = draft.touch_player().apply_damage(self.config.contact_damage);
        let pushed = if map.is_walkable(px - 1, py) {
            px - 1
        } else if map.is_walkable(px + 1, py) {
            px + 1
        } else {
            px
        };
        if pushed != px {
            draft.touch_runtime().x = pushed;
        }
        log::debug!(
            "contact with {} at ({}, {}): -{} hp, pushed to x={}",
            hazard,
            px,
            py,
            lost,
            pushed
        );
    }

    fn check_encounters(
        &self,
        draft: &mut Draft,
        light: &mut LightEngine,
        map: &MapData,
        now_ms: u64,
    ) -> Result<()> {
        if let Some(last) = draft.shadows().last_encounter_check_ms {
            if now_ms.saturating_sub(last) < self.config.encounter_interval_ms {
                return Ok(());
            }
        }
        draft.touch_shadows().last_encounter_check_ms = Some(now_ms);

        let (px, py) = (draft.runtime().x, draft.runtime().y);
        if map.in_safe_zone(px, py) {
            return Ok(());
        }

        let mut found = None;
        {
            let terrain = Terrain::new(map, draft.state(), self.config.min_player_distance);
            for hazard in draft.shadows().iter() {
                if hazard.manhattan_to(px, py) > 1 || now_ms < hazard.cooldown_until_ms {
                    continue;
                }
                let level = terrain.light(light, hazard.x, hazard.y)?;
                if level != LightLevel::Bright {
                    found = Some((hazard.id.clone(), hazard.category, level));
                    break;
                }
            }
        }
        let Some((hazard_id, category, level)) = found else {
            return Ok(());
        };
        let Some(template) = self.config.templates.select(category, level) else {
            return Ok(());
        };
        let template_id = template.to_string();

        let context = EncounterContext {
            hazard_id: hazard_id.clone(),
            category,
            light: level,
            map_id: map.id.clone(),
        };
        let cooldown = now_ms + self.config.encounter_cooldown_ms;
        let shadows = draft.touch_shadows();
        if let Some(hazard) = hazards_mut(shadows).find(|h| h.id == hazard_id) {
            hazard.cooldown_until_ms = cooldown;
            hazard.state = HazardState::Triggered;
        }
        shadows.last_encounter = Some(context.clone());
        log::info!("encounter {} with {} ({})", template_id, hazard_id, level);
        draft.emit(SimEvent::EncounterRequested(EncounterRequest {
            template_id,
            context,
        }));
        Ok(())
    }
}

fn hazards_mut(shadows: &mut ShadowState) -> impl Iterator<Item = &mut Hazard> {
    shadows
        .environmental
        .iter_mut()
        .chain(shadows.story.iter_mut())
}

impl std::fmt::Debug for ShadowSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShadowSystem")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gloam_core::{
        Clock, GameState, Intensity, MapId, MapRegistry, RecordStatus, SafeZone, SpawnConfig,
        SpawnZone, StaticLightDef, StoryHazardRecord, StoryState, TimeConfig,
    };
    use gloam_light::LightConfig;
    use proptest::prelude::*;

    fn moor() -> MapData {
        let mut map = MapData::open("moor", 24, 24, 0);
        map.safe_zones.push(SafeZone {
            name: "shrine".into(),
            x: 12,
            y: 12,
            radius: 2,
        });
        for x in 14..17 {
            map.set_base_light(x, 9, 2);
        }
        map.light_sources.push(StaticLightDef {
            id: "lamp".into(),
            x: 17,
            y: 17,
            radius: 2,
            intensity: Intensity::Bright,
            active: true,
        });
        map.hazard_spawn = Some(SpawnConfig {
            max_active: 6,
            cluster_min: 2,
            cluster_max: 3,
            jitter: 1,
            zones: vec![
                SpawnZone {
                    x: 8,
                    y: 8,
                    width: 12,
                    height: 12,
                },
                SpawnZone {
                    x: 2,
                    y: 14,
                    width: 6,
                    height: 6,
                },
            ],
        });
        map
    }

    fn rig(maps: Vec<MapData>) -> (ShadowSystem, LightEngine) {
        let mut registry = MapRegistry::new();
        for map in maps {
            registry.insert(map).unwrap();
        }
        let registry: Arc<dyn MapProvider> = Arc::new(registry);
        (
            ShadowSystem::new(registry.clone(), ShadowConfig::default()),
            LightEngine::new(registry, LightConfig::default()),
        )
    }

    fn night(story: &str, day: u32) -> GameState {
        GameState::new("moor", 2, 2)
            .with_clock(Clock::at_phase(&TimeConfig::default(), Phase::Night, day))
            .with_story(StoryState {
                story_id: story.to_string(),
                ..Default::default()
            })
    }

    fn start_night(system: &ShadowSystem, light: &mut LightEngine, state: &GameState) -> GameState {
        let mut draft = Draft::new(state);
        light.update(&mut draft).unwrap();
        system
            .handle_phase_start(Phase::Night, &mut draft, light)
            .unwrap();
        draft.into_state()
    }

    fn step(
        system: &ShadowSystem,
        light: &mut LightEngine,
        state: &GameState,
        now_ms: u64,
        dt_ms: f64,
    ) -> (GameState, Vec<SimEvent>) {
        let mut draft = Draft::new(state);
        light.update(&mut draft).unwrap();
        system.update(&mut draft, light, now_ms, dt_ms).unwrap();
        draft.into_parts()
    }

    fn positions(state: &GameState) -> Vec<(i32, i32)> {
        state
            .shadows()
            .environmental
            .iter()
            .map(|h| (h.x, h.y))
            .collect()
    }

    fn assert_all_valid(map: &MapData, state: &GameState, light: &mut LightEngine) {
        let terrain = Terrain::new(map, state, 2);
        for hazard in &state.shadows().environmental {
            assert!(
                terrain.is_valid(light, hazard.x, hazard.y).unwrap(),
                "{} stands on an invalid tile ({}, {})",
                hazard.id,
                hazard.x,
                hazard.y
            );
            assert!(!map.in_safe_zone(hazard.x, hazard.y));
            assert_ne!(
                light.light_on(map, state, hazard.x, hazard.y).unwrap(),
                LightLevel::Bright
            );
        }
    }

    /// Single hazard next to the player on a DIM daytime map
    fn encounter_rig() -> (ShadowSystem, LightEngine, GameState) {
        let (system, light) = rig(vec![MapData::open("moor", 12, 12, 0)]);
        let mut draft = Draft::new(&GameState::new("moor", 5, 5));
        draft
            .touch_shadows()
            .environmental
            .push(Hazard::new("shade-0", HazardCategory::Environmental, 6, 5));
        (system, light, draft.into_state())
    }

    fn encounters(events: &[SimEvent]) -> Vec<&EncounterRequest> {
        events
            .iter()
            .filter_map(|e| match e {
                SimEvent::EncounterRequested(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_spawn_is_deterministic() {
        let (system_a, mut light_a) = rig(vec![moor()]);
        let (system_b, mut light_b) = rig(vec![moor()]);

        let a = start_night(&system_a, &mut light_a, &night("lantern", 3));
        let b = start_night(&system_b, &mut light_b, &night("lantern", 3));

        assert!(!a.shadows().environmental.is_empty());
        assert!(a.shadows().environmental.len() <= 6);
        assert_eq!(positions(&a), positions(&b));
        assert_eq!(a.shadows().environmental, b.shadows().environmental);
    }

    #[test]
    fn test_spawn_runs_once_per_night() {
        let (system, mut light) = rig(vec![moor()]);
        let state = start_night(&system, &mut light, &night("lantern", 1));
        let count = state.shadows().environmental.len();

        let mut draft = Draft::new(&state);
        draft.touch_shadows().environmental.clear();
        assert_eq!(system.spawn(&mut draft, &mut light).unwrap(), 0);
        assert!(draft.shadows().environmental.is_empty());
        assert!(count > 0);
    }

    #[test]
    fn test_spawned_hazards_are_valid() {
        let map = moor();
        let (system, mut light) = rig(vec![map.clone()]);
        let state = start_night(&system, &mut light, &night("lantern", 2));
        assert_all_valid(&map, &state, &mut light);
        for hazard in &state.shadows().environmental {
            assert_eq!(hazard.state, HazardState::Spawned);
            assert!(hazard.anchor.is_some());
        }
    }

    #[test]
    fn test_late_load_spawns_at_night() {
        let (system, mut light) = rig(vec![moor()]);
        let (state, _) = step(&system, &mut light, &night("lantern", 1), 0, 0.0);
        assert!(!state.shadows().environmental.is_empty());
        assert_eq!(
            state.shadows().spawned_for,
            Some(SpawnMark {
                map_id: MapId::new("moor"),
                day: 1
            })
        );
    }

    #[test]
    fn test_dawn_clears_environmental() {
        let (system, mut light) = rig(vec![moor()]);
        let state = start_night(&system, &mut light, &night("lantern", 1));
        let mut draft = Draft::new(&state);
        system
            .handle_phase_start(Phase::Dawn, &mut draft, &mut light)
            .unwrap();
        assert!(draft.shadows().environmental.is_empty());
    }

    #[test]
    fn test_map_change_clears_environmental() {
        let (system, mut light) = rig(vec![moor(), MapData::open("town", 8, 8, 1)]);
        let state = start_night(&system, &mut light, &night("lantern", 1));
        assert!(!state.shadows().environmental.is_empty());

        let mut draft = Draft::new(&state);
        draft.touch_runtime().map_id = MapId::new("town");
        *draft.touch_time() = Clock::at_phase(&TimeConfig::default(), Phase::Dawn, 1);
        light.update(&mut draft).unwrap();
        system.update(&mut draft, &mut light, 0, 0.0).unwrap();
        assert!(draft.shadows().environmental.is_empty());
        assert_eq!(draft.shadows().spawned_for, None);
    }

    #[test]
    fn test_drift_replay_is_identical() {
        let map = moor();
        let run = || {
            let (system, mut light) = rig(vec![moor()]);
            let mut state = start_night(&system, &mut light, &night("lantern", 4));
            let mut now = state.time().elapsed_ms();
            for _ in 0..20 {
                now += 250;
                state = step(&system, &mut light, &state, now, 250.0).0;
            }
            (state, light)
        };
        let (a, mut light) = run();
        let (b, _) = run();
        assert_eq!(a.shadows(), b.shadows());
        assert_all_valid(&map, &a, &mut light);
        assert!(a
            .shadows()
            .environmental
            .iter()
            .all(|h| h.state == HazardState::Drifting));
    }

    #[test]
    fn test_drift_catch_up_is_bounded() {
        let (system, mut light) = rig(vec![moor()]);
        let state = start_night(&system, &mut light, &night("lantern", 1));
        let now = state.time().elapsed_ms() + 60_000;
        let (state, _) = step(&system, &mut light, &state, now, 60_000.0);
        assert!(state.shadows().drift_accumulator_ms < 500.0);

        let (state, _) = step(&system, &mut light, &state, now + 200, 200.0);
        assert_eq!(state.shadows().drift_accumulator_ms, 200.0);
    }

    #[test]
    fn test_encounter_cooldown() {
        let (system, mut light, mut state) = encounter_rig();
        let mut triggered = Vec::new();
        for now in (0..=4000).step_by(100) {
            let (next, events) = step(&system, &mut light, &state, now, 100.0);
            for request in encounters(&events) {
                assert_eq!(request.template_id, "shade_dim");
                assert_eq!(request.context.light, LightLevel::Dim);
                triggered.push(now);
            }
            state = next;
        }
        assert_eq!(triggered[0], 0);
        for pair in triggered.windows(2) {
            assert!(pair[1] - pair[0] >= 2000, "retriggered too soon: {:?}", pair);
        }
        assert!(triggered.len() >= 2);

        let hazard = &state.shadows().environmental[0];
        assert_eq!((hazard.x, hazard.y), (6, 5));
    }

    #[test]
    fn test_encounter_scan_is_throttled() {
        let (system, mut light, state) = encounter_rig();
        let (state, _) = step(&system, &mut light, &state, 1000, 16.0);
        assert_eq!(state.shadows().last_encounter_check_ms, Some(1000));
        let (state, _) = step(&system, &mut light, &state, 1100, 100.0);
        assert_eq!(state.shadows().last_encounter_check_ms, Some(1000));
        let (state, _) = step(&system, &mut light, &state, 1300, 200.0);
        assert_eq!(state.shadows().last_encounter_check_ms, Some(1300));
    }

    #[test]
    fn test_contact_damage_and_push() {
        let mut map = MapData::open("moor", 12, 12, 0);
        let (system, mut light) = rig(vec![map.clone()]);
        let mut draft = Draft::new(&GameState::new("moor", 5, 5));
        draft
            .touch_shadows()
            .environmental
            .push(Hazard::new("shade-0", HazardCategory::Environmental, 5, 5));
        let state = draft.into_state();

        let (after, _) = step(&system, &mut light, &state, 0, 16.0);
        assert_eq!(after.player().hp, 5);
        assert_eq!(after.runtime().x, 4);

        map.set_blocked(4, 5, true);
        let (system, mut light) = rig(vec![map]);
        let (after, _) = step(&system, &mut light, &state, 0, 16.0);
        assert_eq!(after.runtime().x, 6);
    }

    #[test]
    fn test_story_sync_filters_records() {
        let record = |id: &str, map: &str| StoryHazardRecord {
            id: HazardId::new(id),
            map_id: MapId::new(map),
            x: 9,
            y: 9,
            anchor: Some((9, 9)),
            status: RecordStatus::Active,
            required_flags: Vec::new(),
            min_stage: 0,
            max_stage: None,
        };
        let mut flagged = record("warden", "moor");
        flagged.required_flags.push("woke".to_string());
        let mut inactive = record("sleeper", "moor");
        inactive.status = RecordStatus::Inactive;
        let elsewhere = record("drifter", "town");
        let mut later = record("herald", "moor");
        later.min_stage = 2;

        let mut story = StoryState {
            story_id: "lantern".into(),
            stage: 1,
            ..Default::default()
        };
        story.flags.insert("woke".to_string());
        story.hazard_records = vec![flagged, inactive, elsewhere, later];

        let (system, mut light) = rig(vec![MapData::open("moor", 12, 12, 0)]);
        let mut draft = Draft::new(&GameState::new("moor", 0, 0).with_story(story));
        draft.touch_time().paused = true;
        light.update(&mut draft).unwrap();
        system.update(&mut draft, &mut light, 0, 0.0).unwrap();

        let ids: Vec<&str> = draft.shadows().story.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["warden"]);

        draft.touch_shadows().story[0].x = 8;
        system.update(&mut draft, &mut light, 0, 0.0).unwrap();
        assert_eq!(draft.shadows().story[0].x, 8);

        draft.touch_story().hazard_records[0].status = RecordStatus::Resolved;
        system.update(&mut draft, &mut light, 0, 0.0).unwrap();
        assert!(draft.shadows().story.is_empty());
    }

    #[test]
    fn test_dissolve_defaults_to_last_encounter() {
        let (system, mut light, state) = encounter_rig();
        let (state, events) = step(&system, &mut light, &state, 0, 16.0);
        assert_eq!(encounters(&events).len(), 1);

        let mut draft = Draft::new(&state);
        assert_eq!(system.dissolve(&mut draft, None), Some(HazardId::new("shade-0")));
        assert!(draft.shadows().environmental.is_empty());
        assert_eq!(
            draft.events(),
            &[SimEvent::HazardDissolved {
                id: HazardId::new("shade-0")
            }]
        );
        assert_eq!(system.dissolve(&mut draft, Some(&HazardId::new("ghost"))), None);
    }

    fn warden_rig() -> (ShadowSystem, LightEngine, GameState) {
        let (system, light) = rig(vec![MapData::open("moor", 12, 12, 0)]);
        let story = StoryState {
            story_id: "lantern".into(),
            hazard_records: vec![StoryHazardRecord {
                id: HazardId::new("warden"),
                map_id: MapId::new("moor"),
                x: 6,
                y: 5,
                anchor: None,
                status: RecordStatus::Active,
                required_flags: Vec::new(),
                min_stage: 0,
                max_stage: None,
            }],
            ..Default::default()
        };
        (system, light, GameState::new("moor", 5, 5).with_story(story))
    }

    #[test]
    fn test_dissolved_story_hazard_stays_gone() {
        let (system, mut light, mut state) = warden_rig();
        let mut triggered = Vec::new();
        for now in [0, 100, 400, 700] {
            let (next, events) = step(&system, &mut light, &state, now, 100.0);
            let mut draft = Draft::new(&next);
            for _ in encounters(&events) {
                triggered.push(now);
                assert_eq!(system.dissolve(&mut draft, None), Some(HazardId::new("warden")));
            }
            state = draft.into_state();
        }
        assert_eq!(triggered, vec![0]);
        assert!(state.shadows().story.is_empty());
        assert_eq!(state.shadows().dissolved, vec![HazardId::new("warden")]);

        let mut draft = Draft::new(&state);
        system
            .handle_phase_start(Phase::Dawn, &mut draft, &mut light)
            .unwrap();
        assert!(draft.shadows().dissolved.is_empty());
        let (state, _) = step(&system, &mut light, &draft.into_state(), 800, 100.0);
        assert_eq!(state.shadows().story.len(), 1);
    }

    #[test]
    fn test_dissolved_id_forgotten_when_record_resolves() {
        let (system, mut light, state) = warden_rig();
        let (state, _) = step(&system, &mut light, &state, 0, 16.0);
        let mut draft = Draft::new(&state);
        system.dissolve(&mut draft, Some(&HazardId::new("warden")));
        draft.touch_story().hazard_records[0].status = RecordStatus::Resolved;
        system.update(&mut draft, &mut light, 100, 100.0).unwrap();
        assert!(draft.shadows().dissolved.is_empty());
        assert!(draft.shadows().story.is_empty());
    }

    #[test]
    fn test_paused_skip_still_runs() {
        let (system, mut light, state) = encounter_rig();
        let mut draft = Draft::new(&state);
        draft.touch_time().paused = true;
        light.update(&mut draft).unwrap();
        system.update(&mut draft, &mut light, 0, 0.0).unwrap();
        assert_eq!(draft.shadows().last_encounter_check_ms, None);

        system.update(&mut draft, &mut light, 5000, 5000.0).unwrap();
        assert_eq!(draft.shadows().last_encounter_check_ms, Some(5000));
        assert_eq!(encounters(draft.events()).len(), 1);
    }

    proptest! {
        #[test]
        fn prop_spawn_validity(story in "[a-z]{1,8}", day in 1u32..30) {
            let map = moor();
            let (system, mut light) = rig(vec![map.clone()]);
            let state = start_night(&system, &mut light, &night(&story, day));
            prop_assert!(state.shadows().environmental.len() <= 6);
            assert_all_valid(&map, &state, &mut light);
        }

        #[test]
        fn prop_spawn_is_reproducible(story in "[a-z]{1,8}", day in 1u32..30) {
            let (system, mut light) = rig(vec![moor()]);
            let first = start_night(&system, &mut light, &night(&story, day));
            let (system, mut light) = rig(vec![moor()]);
            let second = start_night(&system, &mut light, &night(&story, day));
            prop_assert_eq!(positions(&first), positions(&second));
        }
    }
}
