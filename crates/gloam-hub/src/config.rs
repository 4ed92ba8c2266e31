//! Kernel configuration
//!
//! One document configures every subsystem. All sections are optional in
//! RON; missing fields take their defaults.
//!
//! ```
//! use gloam_hub::KernelConfig;
//!
//! let config = KernelConfig::from_ron_str(
//!     "(time: (night_seconds: 120.0), shadows: (contact_damage: 2))",
//! )
//! .unwrap();
//! assert_eq!(config.time.night_seconds, 120.0);
//! assert_eq!(config.time.day_seconds, 300.0);
//! assert_eq!(config.shadows.contact_damage, 2);
//! ```

use crate::journal::JournalConfig;
use crate::validate::ValidationMode;
use crate::{Error, Result};
use gloam_core::{PausedModes, TimeConfig};
use gloam_light::LightConfig;
use gloam_shadows::ShadowConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub time: TimeConfig,
    pub light: LightConfig,
    pub shadows: ShadowConfig,
    pub validation: ValidationMode,
    pub journal: JournalConfig,
    /// Modes in which the clock stops
    pub paused_modes: PausedModes,
}

impl KernelConfig {
    /// Parse and validate a RON document
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let config: KernelConfig = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        self.time
            .validate()
            .map_err(|e| Error::Config(format!("time: {}", e)))?;
        self.light
            .validate()
            .map_err(|e| Error::Config(format!("light: {}", e)))?;
        self.shadows
            .validate()
            .map_err(|e| Error::Config(format!("shadows: {}", e)))?;
        Ok(())
    }
}
