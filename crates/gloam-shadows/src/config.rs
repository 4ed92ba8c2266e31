//! Tuning for the hazard population system

use gloam_core::{HazardCategory, LightLevel};
use serde::{Deserialize, Serialize};

/// Encounter template ids by hazard category and tile light
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterTemplates {
    pub environmental_dark: String,
    pub environmental_dim: String,
    pub story_dark: String,
    pub story_dim: String,
}

impl EncounterTemplates {
    /// Template for an encounter; BRIGHT tiles never start one
    pub fn select(&self, category: HazardCategory, light: LightLevel) -> Option<&str> {
        let id = match (category, light) {
            (_, LightLevel::Bright) => return None,
            (HazardCategory::Environmental, LightLevel::Dark) => &self.environmental_dark,
            (HazardCategory::Environmental, LightLevel::Dim) => &self.environmental_dim,
            (HazardCategory::Story, LightLevel::Dark) => &self.story_dark,
            (HazardCategory::Story, LightLevel::Dim) => &self.story_dim,
        };
        Some(id)
    }
}

impl Default for EncounterTemplates {
    fn default() -> Self {
        Self {
            environmental_dark: "shade_dark".to_string(),
            environmental_dim: "shade_dim".to_string(),
            story_dark: "story_shade_dark".to_string(),
            story_dim: "story_shade_dim".to_string(),
        }
    }
}

/// Configuration for `ShadowSystem`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    /// Simulated time between drift steps
    pub drift_interval_ms: f64,
    /// Upper bound on drift steps run by one update
    pub max_drift_steps: u32,
    /// Minimum simulated time between encounter scans
    pub encounter_interval_ms: u64,
    /// Per-hazard cooldown after it triggers an encounter
    pub encounter_cooldown_ms: u64,
    /// Damage dealt when a hazard shares the player's tile
    pub contact_damage: u32,
    /// Spawn attempts per active slot
    pub attempts_per_slot: u32,
    /// Placement tries per cluster member
    pub placements_per_member: u32,
    /// Hazards must stay strictly farther than this (Manhattan) from the player
    pub min_player_distance: i32,
    pub templates: EncounterTemplates,
}

impl ShadowConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.drift_interval_ms.is_finite() && self.drift_interval_ms > 0.0) {
            return Err(format!(
                "drift_interval_ms must be positive, got {}",
                self.drift_interval_ms
            ));
        }
        if self.max_drift_steps == 0 {
            return Err("max_drift_steps must be at least 1".to_string());
        }
        if self.placements_per_member == 0 {
            return Err("placements_per_member must be at least 1".to_string());
        }
        if self.min_player_distance < 0 {
            return Err("min_player_distance must not be negative".to_string());
        }
        Ok(())
    }
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            drift_interval_ms: 500.0,
            max_drift_steps: 8,
            encounter_interval_ms: 300,
            encounter_cooldown_ms: 2000,
            contact_damage: 1,
            attempts_per_slot: 12,
            placements_per_member: 8,
            min_player_distance: 2,
            templates: EncounterTemplates::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_selection() {
        let t = EncounterTemplates::default();
        assert_eq!(
            t.select(HazardCategory::Environmental, LightLevel::Dark),
            Some("shade_dark")
        );
        assert_eq!(
            t.select(HazardCategory::Story, LightLevel::Dim),
            Some("story_shade_dim")
        );
        assert_eq!(t.select(HazardCategory::Story, LightLevel::Bright), None);
    }

    #[test]
    fn test_validate() {
        assert!(ShadowConfig::default().validate().is_ok());
        let config = ShadowConfig {
            drift_interval_ms: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
