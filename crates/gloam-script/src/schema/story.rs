//! Story progress schema
//!
//! Persisted story state, including the story hazard records the kernel
//! materializes each step.

use gloam_core::{StoryHazardRecord, StoryState};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryFile {
    pub story_id: String,
    #[serde(default)]
    pub stage: u32,
    #[serde(default)]
    pub flags: IndexSet<String>,
    #[serde(default)]
    pub hazards: Vec<StoryHazardRecord>,
}

impl From<StoryFile> for StoryState {
    fn from(file: StoryFile) -> Self {
        StoryState {
            story_id: file.story_id,
            stage: file.stage,
            flags: file.flags,
            hazard_records: file.hazards,
        }
    }
}
