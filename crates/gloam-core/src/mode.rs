//! Game mode classification

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Tells the kernel whether simulated time stands still in a game mode
pub trait ModeClassifier {
    fn is_time_paused(&self, mode: &str) -> bool;
}

/// A classifier backed by a fixed set of paused mode labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PausedModes {
    modes: IndexSet<String>,
}

impl PausedModes {
    pub fn new<I, S>(modes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            modes: modes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn insert(&mut self, mode: impl Into<String>) {
        self.modes.insert(mode.into());
    }
}

impl Default for PausedModes {
    fn default() -> Self {
        Self::new(["dialogue", "encounter", "menu", "crafting"])
    }
}

impl ModeClassifier for PausedModes {
    fn is_time_paused(&self, mode: &str) -> bool {
        self.modes.contains(mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_modes() {
        let modes = PausedModes::default();
        assert!(modes.is_time_paused("dialogue"));
        assert!(!modes.is_time_paused("explore"));
    }

    #[test]
    fn test_custom_modes() {
        let mut modes = PausedModes::new(["cutscene"]);
        modes.insert("photo");
        assert!(modes.is_time_paused("photo"));
        assert!(!modes.is_time_paused("dialogue"));
    }
}
