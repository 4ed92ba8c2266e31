//! One drift step for a single hazard

use crate::placement::Terrain;
use gloam_core::{Hazard, HazardCategory, HazardId, LightLevel, Result};
use gloam_light::LightEngine;

/// Stay, then north, east, south, west
const MOVES: [(i32, i32); 5] = [(0, 0), (0, -1), (1, 0), (0, 1), (-1, 0)];
const NEIGHBORS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// Fractional tiebreak in [0, 1) for a candidate tile
///
/// Pure function of its inputs so replays pick the same move.
pub fn drift_tiebreak(id: &HazardId, bucket: u64, x: i32, y: i32) -> f64 {
    gloam_core::unit_hash(&format!("{}|{}|{},{}", id, bucket, x, y))
}

/// Pick the best-scoring destination for `hazard`, or `None` if no candidate is valid
///
/// Scores: 3 for a DARK tile, 4 for DIM; +2 for environmental hazards next to
/// a BRIGHT tile; -2 within one tile of the player; plus the tiebreak.
pub(crate) fn choose_move(
    hazard: &Hazard,
    terrain: &Terrain<'_>,
    light: &mut LightEngine,
    bucket: u64,
) -> Result<Option<(i32, i32)>> {
    let mut best: Option<(f64, (i32, i32))> = None;
    for (dx, dy) in MOVES {
        let (x, y) = (hazard.x + dx, hazard.y + dy);
        let level = match terrain.standing_light(light, x, y)? {
            Some(level) => level,
            None => continue,
        };
        let mut score = if level == LightLevel::Dim { 4.0 } else { 3.0 };
        if hazard.category == HazardCategory::Environmental
            && next_to_bright(terrain, light, x, y)?
        {
            score += 2.0;
        }
        if terrain.player_distance(x, y) <= 1 {
            score -= 2.0;
        }
        score += drift_tiebreak(&hazard.id, bucket, x, y);
        if best.map_or(true, |(top, _)| score > top) {
            best = Some((score, (x, y)));
        }
    }
    Ok(best.map(|(_, dest)| dest))
}

fn next_to_bright(terrain: &Terrain<'_>, light: &mut LightEngine, x: i32, y: i32) -> Result<bool> {
    for (dx, dy) in NEIGHBORS {
        if terrain.light(light, x + dx, y + dy)? == LightLevel::Bright {
            return Ok(true);
        }
    }
    Ok(false)
}
