//! Where hazards may stand, and seeded cluster placement

use gloam_core::{GameState, LightLevel, MapData, MapId, Result, SeededRng, SpawnConfig};
use gloam_light::LightEngine;

/// Seed for the environmental population of one map on one night
///
/// FNV-1a of `"{story}|{day}|{map}"`.
pub fn spawn_seed(story_id: &str, day: u32, map_id: &MapId) -> u32 {
    gloam_core::seed_from_str(&format!("{}|{}|{}", story_id, day, map_id))
}

/// Read-only view used to judge candidate tiles
pub(crate) struct Terrain<'a> {
    pub map: &'a MapData,
    pub state: &'a GameState,
    pub min_player_distance: i32,
}

impl<'a> Terrain<'a> {
    pub fn new(map: &'a MapData, state: &'a GameState, min_player_distance: i32) -> Self {
        Self {
            map,
            state,
            min_player_distance,
        }
    }

    pub fn light(&self, light: &mut LightEngine, x: i32, y: i32) -> Result<LightLevel> {
        light.light_on(self.map, self.state, x, y)
    }

    pub fn player_distance(&self, x: i32, y: i32) -> i32 {
        let runtime = self.state.runtime();
        (runtime.x - x).abs() + (runtime.y - y).abs()
    }

    /// Shared predicate for spawning and drifting
    ///
    /// In bounds, not blocked, outside every safe zone, not BRIGHT, and more
    /// than `min_player_distance` tiles (Manhattan) from the player.
    pub fn is_valid(&self, light: &mut LightEngine, x: i32, y: i32) -> Result<bool> {
        Ok(self.standing_light(light, x, y)?.is_some())
    }

    /// Light of a tile a hazard may stand on, or `None` if it may not
    pub fn standing_light(
        &self,
        light: &mut LightEngine,
        x: i32,
        y: i32,
    ) -> Result<Option<LightLevel>> {
        if !self.map.is_walkable(x, y) || self.map.in_safe_zone(x, y) {
            return Ok(None);
        }
        if self.player_distance(x, y) <= self.min_player_distance {
            return Ok(None);
        }
        let level = self.light(light, x, y)?;
        Ok((level != LightLevel::Bright).then_some(level))
    }
}

/// A hazard position chosen by the spawner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Placement {
    pub x: i32,
    pub y: i32,
    pub anchor: (i32, i32),
}

/// Place up to `config.max_active - active` hazards
///
/// Draw order per attempt: zone index, center x, center y, cluster size;
/// then per member and try: jitter x, jitter y. The first valid try for a
/// member is accepted. Stops when the population is full or after
/// `max_active * attempts_per_slot` attempts.
pub(crate) fn plan_clusters(
    rng: &mut SeededRng,
    config: &SpawnConfig,
    terrain: &Terrain<'_>,
    light: &mut LightEngine,
    active: usize,
    attempts_per_slot: u32,
    placements_per_member: u32,
) -> Result<Vec<Placement>> {
    let target = config.max_active as usize;
    let mut placed = Vec::new();
    if config.zones.is_empty() || active >= target {
        return Ok(placed);
    }
    let attempts = config.max_active.saturating_mul(attempts_per_slot);
    let jitter = config.jitter.max(0);

    'attempts: for _ in 0..attempts {
        if active + placed.len() >= target {
            break;
        }
        let zone = match rng.pick(&config.zones) {
            Some(zone) => zone,
            None => break,
        };
        let cx = zone.x + rng.below(zone.width) as i32;
        let cy = zone.y + rng.below(zone.height) as i32;
        let size = rng.range_i32(config.cluster_min as i32, config.cluster_max as i32);

        for _ in 0..size.max(0) {
            if active + placed.len() >= target {
                break 'attempts;
            }
            for _ in 0..placements_per_member {
                let x = cx + rng.range_i32(-jitter, jitter);
                let y = cy + rng.range_i32(-jitter, jitter);
                if terrain.is_valid(light, x, y)? {
                    placed.push(Placement {
                        x,
                        y,
                        anchor: (cx, cy),
                    });
                    break;
                }
            }
        }
    }
    Ok(placed)
}
