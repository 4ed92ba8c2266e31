//! Map content consumed by the kernel
//!
//! Maps are content: the kernel never creates or edits them. A
//! [`MapProvider`] is built once at start-up and shared by reference.

use crate::error::{Error, Result};
use crate::state::{Intensity, LightSource, SourceKind};
use crate::{MapId, SourceId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Circular region where hazards never spawn or linger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeZone {
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub radius: i32,
}

impl SafeZone {
    pub fn contains(&self, x: i32, y: i32) -> bool {
        let dx = x as i64 - self.x as i64;
        let dy = y as i64 - self.y as i64;
        let r = self.radius as i64;
        dx * dx + dy * dy <= r * r
    }
}

/// A light source embedded in map content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticLightDef {
    pub id: SourceId,
    pub x: i32,
    pub y: i32,
    pub radius: i32,
    pub intensity: Intensity,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl StaticLightDef {
    pub fn to_source(&self, map_id: &MapId) -> LightSource {
        LightSource {
            id: self.id.clone(),
            kind: SourceKind::Static,
            map_id: map_id.clone(),
            x: self.x,
            y: self.y,
            radius: self.radius,
            intensity: self.intensity,
            active: self.active,
            expires_at: None,
        }
    }
}

/// Rectangle of tiles hazard clusters may be centered in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnZone {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Hazard population settings for a map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnConfig {
    pub max_active: u32,
    pub cluster_min: u32,
    pub cluster_max: u32,
    /// Maximum offset of a cluster member from the cluster center, per axis
    #[serde(default = "default_jitter")]
    pub jitter: i32,
    pub zones: Vec<SpawnZone>,
}

fn default_jitter() -> i32 {
    1
}

/// Tiles, collision and embedded features of one map
#[derive(Debug, Clone, PartialEq)]
pub struct MapData {
    pub id: MapId,
    pub width: i32,
    pub height: i32,
    /// Row-major base light per tile (0..=2)
    pub base_light: Vec<u8>,
    /// Row-major collision flags
    pub blocked: Vec<bool>,
    pub safe_zones: Vec<SafeZone>,
    pub light_sources: Vec<StaticLightDef>,
    pub hazard_spawn: Option<SpawnConfig>,
}

impl MapData {
    /// An open map with uniform base light and no features
    pub fn open(id: impl Into<MapId>, width: i32, height: i32, base_light: u8) -> Self {
        let tiles = (width.max(0) * height.max(0)) as usize;
        Self {
            id: id.into(),
            width,
            height,
            base_light: vec![base_light; tiles],
            blocked: vec![false; tiles],
            safe_zones: Vec::new(),
            light_sources: Vec::new(),
            hazard_spawn: None,
        }
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        self.in_bounds(x, y)
            .then(|| (y * self.width + x) as usize)
    }

    /// Base light of a tile; out-of-bounds tiles are dark
    pub fn base_light(&self, x: i32, y: i32) -> u8 {
        self.index(x, y)
            .and_then(|i| self.base_light.get(i).copied())
            .unwrap_or(0)
    }

    /// Collision flag of a tile; out-of-bounds tiles are blocked
    pub fn is_blocked(&self, x: i32, y: i32) -> bool {
        self.index(x, y)
            .and_then(|i| self.blocked.get(i).copied())
            .unwrap_or(true)
    }

    pub fn is_walkable(&self, x: i32, y: i32) -> bool {
        !self.is_blocked(x, y)
    }

    pub fn set_blocked(&mut self, x: i32, y: i32, blocked: bool) {
        if let Some(i) = self.index(x, y) {
            self.blocked[i] = blocked;
        }
    }

    pub fn set_base_light(&mut self, x: i32, y: i32, level: u8) {
        if let Some(i) = self.index(x, y) {
            self.base_light[i] = level;
        }
    }

    pub fn in_safe_zone(&self, x: i32, y: i32) -> bool {
        self.safe_zones.iter().any(|z| z.contains(x, y))
    }

    /// Embedded light sources, validated
    pub fn static_sources(&self) -> Result<Vec<LightSource>> {
        self.light_sources
            .iter()
            .map(|def| {
                self.check_light(def)?;
                Ok(def.to_source(&self.id))
            })
            .collect()
    }

    fn check_light(&self, def: &StaticLightDef) -> Result<()> {
        let reason = if def.radius < 0 {
            Some(format!("negative radius {}", def.radius))
        } else if !self.in_bounds(def.x, def.y) {
            Some(format!("position ({}, {}) outside map", def.x, def.y))
        } else {
            None
        };
        match reason {
            Some(reason) => Err(Error::InvalidLightSource {
                map: self.id.clone(),
                id: def.id.to_string(),
                reason,
            }),
            None => Ok(()),
        }
    }

    /// Check the map for content errors
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Error::InvalidMap {
            map: self.id.clone(),
            reason,
        };
        if self.width <= 0 || self.height <= 0 {
            return Err(invalid(format!(
                "dimensions {}x{} must be positive",
                self.width, self.height
            )));
        }
        let tiles = (self.width * self.height) as usize;
        if self.base_light.len() != tiles || self.blocked.len() != tiles {
            return Err(invalid(format!(
                "expected {} tiles, got {} light / {} collision",
                tiles,
                self.base_light.len(),
                self.blocked.len()
            )));
        }
        if let Some(level) = self.base_light.iter().find(|l| **l > 2) {
            return Err(invalid(format!("base light {} out of range", level)));
        }
        if let Some(zone) = self.safe_zones.iter().find(|z| z.radius < 0) {
            return Err(invalid(format!(
                "safe zone {} has negative radius {}",
                zone.name, zone.radius
            )));
        }
        for def in &self.light_sources {
            self.check_light(def)?;
        }
        if let Some(spawn) = &self.hazard_spawn {
            self.check_spawn(spawn)?;
        }
        Ok(())
    }

    fn check_spawn(&self, spawn: &SpawnConfig) -> Result<()> {
        let invalid = |reason: String| Error::InvalidSpawnConfig {
            map: self.id.clone(),
            reason,
        };
        if spawn.cluster_min == 0 || spawn.cluster_min > spawn.cluster_max {
            return Err(invalid(format!(
                "cluster size range [{}, {}] is empty",
                spawn.cluster_min, spawn.cluster_max
            )));
        }
        if spawn.jitter < 0 {
            return Err(invalid(format!("negative jitter {}", spawn.jitter)));
        }
        for zone in &spawn.zones {
            if zone.width == 0 || zone.height == 0 {
                return Err(invalid(format!(
                    "zone at ({}, {}) has no area",
                    zone.x, zone.y
                )));
            }
        }
        Ok(())
    }
}

/// Source of map content by id
pub trait MapProvider {
    fn map(&self, id: &MapId) -> Option<Arc<MapData>>;

    /// Look up a map, treating a missing id as a content error
    fn require(&self, id: &MapId) -> Result<Arc<MapData>> {
        self.map(id).ok_or_else(|| Error::UnknownMap(id.clone()))
    }
}

/// In-memory map registry
#[derive(Debug, Clone, Default)]
pub struct MapRegistry {
    maps: IndexMap<MapId, Arc<MapData>>,
}

impl MapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and register a map, replacing any map with the same id
    pub fn insert(&mut self, map: MapData) -> Result<()> {
        map.validate()?;
        self.maps.insert(map.id.clone(), Arc::new(map));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &MapId> {
        self.maps.keys()
    }
}

impl MapProvider for MapRegistry {
    fn map(&self, id: &MapId) -> Option<Arc<MapData>> {
        self.maps.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn torch(x: i32, y: i32, radius: i32) -> StaticLightDef {
        StaticLightDef {
            id: "torch".into(),
            x,
            y,
            radius,
            intensity: Intensity::Bright,
            active: true,
        }
    }

    #[test]
    fn test_tile_queries() {
        let mut map = MapData::open("m", 4, 3, 1);
        map.set_blocked(1, 1, true);
        map.set_base_light(2, 2, 2);

        assert!(map.is_blocked(1, 1));
        assert!(map.is_walkable(0, 0));
        assert!(map.is_blocked(-1, 0));
        assert!(map.is_blocked(4, 0));
        assert_eq!(map.base_light(2, 2), 2);
        assert_eq!(map.base_light(9, 9), 0);
    }

    #[test]
    fn test_safe_zone() {
        let mut map = MapData::open("m", 10, 10, 1);
        map.safe_zones.push(SafeZone {
            name: "shrine".into(),
            x: 5,
            y: 5,
            radius: 1,
        });
        assert!(map.in_safe_zone(5, 6));
        assert!(!map.in_safe_zone(6, 6));
    }

    #[test]
    fn test_invalid_light_is_fatal() {
        let mut map = MapData::open("m", 4, 4, 1);
        map.light_sources.push(torch(9, 9, 2));
        assert!(matches!(
            map.validate(),
            Err(Error::InvalidLightSource { .. })
        ));
        assert!(map.static_sources().is_err());

        let mut map = MapData::open("m", 4, 4, 1);
        map.light_sources.push(torch(1, 1, -1));
        assert!(map.static_sources().is_err());
    }

    #[test]
    fn test_invalid_spawn_config() {
        let mut map = MapData::open("m", 4, 4, 1);
        map.hazard_spawn = Some(SpawnConfig {
            max_active: 3,
            cluster_min: 3,
            cluster_max: 2,
            jitter: 1,
            zones: vec![],
        });
        assert!(matches!(
            map.validate(),
            Err(Error::InvalidSpawnConfig { .. })
        ));
    }

    #[test]
    fn test_registry() {
        let mut registry = MapRegistry::new();
        registry.insert(MapData::open("marsh", 8, 8, 1)).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.require(&MapId::new("marsh")).is_ok());
        assert_eq!(
            registry.require(&MapId::new("nowhere")).unwrap_err(),
            Error::UnknownMap(MapId::new("nowhere"))
        );
    }

    #[test]
    fn test_registry_rejects_bad_map() {
        let mut registry = MapRegistry::new();
        let mut map = MapData::open("m", 2, 2, 1);
        map.base_light.pop();
        assert!(registry.insert(map).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_negative_safe_zone_radius() {
        let mut map = MapData::open("m", 4, 4, 1);
        map.safe_zones.push(SafeZone {
            name: "well".into(),
            x: 1,
            y: 1,
            radius: -1,
        });
        assert!(matches!(map.validate(), Err(Error::InvalidMap { .. })));
    }
}
