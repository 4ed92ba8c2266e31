//! Per-chunk cache of static light contribution
//!
//! Entries are keyed by map, chunk coordinates and the two version counters.
//! Invalidation never touches individual entries: bumping the versions and
//! clearing the map is the only way entries go away.

use gloam_core::{LightSource, MapData, MapId};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ChunkKey {
    map: MapId,
    cx: i32,
    cy: i32,
    ambient_version: u64,
    sources_version: u64,
}

/// Cached static contribution grids
#[derive(Debug, Clone)]
pub struct ChunkCache {
    chunk_size: i32,
    entries: HashMap<ChunkKey, Vec<u8>>,
    ambient_version: u64,
    sources_version: u64,
    recomputes: u64,
}

impl ChunkCache {
    pub fn new(chunk_size: i32) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            entries: HashMap::new(),
            ambient_version: 0,
            sources_version: 0,
            recomputes: 0,
        }
    }

    /// Bump both versions and drop every entry
    pub fn invalidate(&mut self) {
        self.ambient_version += 1;
        self.sources_version += 1;
        self.entries.clear();
    }

    /// Drop every entry without touching the versions
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn versions(&self) -> (u64, u64) {
        (self.ambient_version, self.sources_version)
    }

    pub fn sources_version(&self) -> u64 {
        self.sources_version
    }

    /// Number of chunk grids computed since creation
    pub fn recompute_count(&self) -> u64 {
        self.recomputes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Static contribution at an in-bounds tile, computing its chunk if needed
    pub fn contribution(&mut self, map: &MapData, sources: &[LightSource], x: i32, y: i32) -> u8 {
        let size = self.chunk_size;
        let cx = x.div_euclid(size);
        let cy = y.div_euclid(size);
        let key = ChunkKey {
            map: map.id.clone(),
            cx,
            cy,
            ambient_version: self.ambient_version,
            sources_version: self.sources_version,
        };
        if !self.entries.contains_key(&key) {
            let grid = compute_chunk(size, cx, cy, sources);
            self.recomputes += 1;
            log::trace!("light chunk ({}, {}) on {} recomputed", cx, cy, map.id);
            self.entries.insert(key.clone(), grid);
        }
        let grid = &self.entries[&key];
        let lx = x - cx * size;
        let ly = y - cy * size;
        grid[(ly * size + lx) as usize]
    }
}

fn compute_chunk(size: i32, cx: i32, cy: i32, sources: &[LightSource]) -> Vec<u8> {
    let mut grid = vec![0u8; (size * size) as usize];
    let x0 = cx * size;
    let y0 = cy * size;

    for source in sources.iter().filter(|s| s.active && s.radius >= 0) {
        let level = source.intensity.level().numeric();
        // Only visit the part of the source's bounding box inside this chunk
        let min_x = source.x.saturating_sub(source.radius).max(x0);
        let max_x = source.x.saturating_add(source.radius).min(x0 + size - 1);
        let min_y = source.y.saturating_sub(source.radius).max(y0);
        let max_y = source.y.saturating_add(source.radius).min(y0 + size - 1);
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                if source.covers(x, y) {
                    let cell = &mut grid[((y - y0) * size + (x - x0)) as usize];
                    *cell = (*cell).max(level);
                }
            }
        }
    }
    grid
}
