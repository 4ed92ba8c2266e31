//! Light engine configuration

use gloam_core::Intensity;
use serde::{Deserialize, Serialize};

/// Tunables for the light engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    /// Side length of a cache chunk, in tiles
    pub chunk_size: i32,
    /// Lantern radius without lamp oil
    pub lantern_radius: i32,
    /// Lantern radius while the oil status is active
    pub oil_lantern_radius: i32,
    /// Status id that extends the lantern
    pub oil_status: String,
    pub lantern_intensity: Intensity,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            chunk_size: 16,
            lantern_radius: 2,
            oil_lantern_radius: 3,
            oil_status: "lamp_oil".to_string(),
            lantern_intensity: Intensity::Dim,
        }
    }
}

impl LightConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size <= 0 {
            return Err(format!("chunk size must be positive, got {}", self.chunk_size));
        }
        if self.lantern_radius < 0 || self.oil_lantern_radius < 0 {
            return Err("lantern radii must not be negative".to_string());
        }
        Ok(())
    }
}
