//! Map file schema
//!
//! Tiles are drawn as rows of glyphs; the legend gives each glyph its base
//! light and collision:
//!
//! ```ron
//! (
//!     id: "crypt",
//!     rows: [
//!         "#####",
//!         "#..o#",
//!         "#####",
//!     ],
//!     legend: [
//!         (glyph: '#', blocked: true),
//!         (glyph: '.', light: 0),
//!         (glyph: 'o', light: 1),
//!     ],
//! )
//! ```

use crate::error::{Error, Result};
use gloam_core::{MapData, MapId, SafeZone, SpawnConfig, StaticLightDef};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Meaning of one glyph in a map drawing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileDef {
    pub glyph: char,
    /// Base light, 0 (dark) to 2 (bright)
    #[serde(default)]
    pub light: u8,
    #[serde(default)]
    pub blocked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapFile {
    pub id: MapId,
    pub rows: Vec<String>,
    pub legend: Vec<TileDef>,
    #[serde(default)]
    pub safe_zones: Vec<SafeZone>,
    #[serde(default)]
    pub lights: Vec<StaticLightDef>,
    #[serde(default)]
    pub spawn: Option<SpawnConfig>,
}

impl MapFile {
    /// Rasterize the drawing into map data
    ///
    /// Does not run `MapData::validate`; the registry does that on insert.
    pub fn into_map_data(self) -> Result<MapData> {
        let mut legend = HashMap::new();
        for tile in &self.legend {
            if legend.insert(tile.glyph, tile).is_some() {
                return Err(Error::InvalidSchema(format!(
                    "map {}: glyph {:?} defined twice",
                    self.id, tile.glyph
                )));
            }
        }

        let height = self.rows.len();
        let width = self.rows.first().map_or(0, |row| row.chars().count());
        if height == 0 || width == 0 {
            return Err(Error::InvalidSchema(format!("map {} has no tiles", self.id)));
        }

        let mut base_light = Vec::with_capacity(width * height);
        let mut blocked = Vec::with_capacity(width * height);
        for (y, row) in self.rows.iter().enumerate() {
            if row.chars().count() != width {
                return Err(Error::InvalidSchema(format!(
                    "map {}: row {} is {} wide, expected {}",
                    self.id,
                    y,
                    row.chars().count(),
                    width
                )));
            }
            for (x, glyph) in row.chars().enumerate() {
                let tile = legend.get(&glyph).ok_or_else(|| {
                    Error::InvalidSchema(format!(
                        "map {}: unknown glyph {:?} at ({}, {})",
                        self.id, glyph, x, y
                    ))
                })?;
                base_light.push(tile.light);
                blocked.push(tile.blocked);
            }
        }

        Ok(MapData {
            id: self.id,
            width: width as i32,
            height: height as i32,
            base_light,
            blocked,
            safe_zones: self.safe_zones,
            light_sources: self.lights,
            hazard_spawn: self.spawn,
        })
    }
}
