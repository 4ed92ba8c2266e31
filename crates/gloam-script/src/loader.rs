//! RON content loader

use crate::error::{Error, Result};
use crate::schema::{MapFile, StoryFile};
use gloam_core::{MapProvider, MapRegistry, StoryState};
use gloam_hub::KernelConfig;
use indexmap::IndexMap;
use std::fs;
use std::path::Path;

/// Loaded kernel content
#[derive(Debug, Default)]
pub struct Content {
    /// Validated maps by ID
    pub maps: MapRegistry,
    /// Story states by story ID
    pub stories: IndexMap<String, StoryState>,
    /// Kernel configuration, if a config file was loaded
    pub config: Option<KernelConfig>,
}

impl Content {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn story(&self, id: &str) -> Option<&StoryState> {
        self.stories.get(id)
    }

    /// The loaded configuration, or the defaults
    pub fn config_or_default(&self) -> KernelConfig {
        self.config.clone().unwrap_or_default()
    }
}

/// Loader for RON content files
pub struct Loader {
    content: Content,
}

impl Loader {
    pub fn new() -> Self {
        Self {
            content: Content::new(),
        }
    }

    /// Load a single RON file
    ///
    /// The kind is picked from the file name (`config`/`kernel`) or from the
    /// fields it declares (`rows:` for maps, `story_id:` for stories).
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

        log::debug!("loading content file {:?}", path);
        if filename.contains("config") || filename.contains("kernel") {
            self.load_config_str(&content)
        } else if content.contains("rows:") {
            self.load_map_str(&content)
        } else if content.contains("story_id:") {
            self.load_story_str(&content)
        } else {
            Err(Error::InvalidSchema(format!(
                "{:?} is not a map, story or config file",
                path
            )))
        }
    }

    /// Load a map from a RON string
    pub fn load_map_str(&mut self, content: &str) -> Result<()> {
        let file: MapFile = ron::from_str(content)?;
        if self.content.maps.map(&file.id).is_some() {
            return Err(Error::DuplicateDefinition(format!("map {}", file.id)));
        }
        let map = file.into_map_data()?;
        log::debug!("loaded map {} ({}x{})", map.id, map.width, map.height);
        self.content.maps.insert(map)?;
        Ok(())
    }

    /// Load a story state from a RON string
    pub fn load_story_str(&mut self, content: &str) -> Result<()> {
        let file: StoryFile = ron::from_str(content)?;
        if self.content.stories.contains_key(&file.story_id) {
            return Err(Error::DuplicateDefinition(format!(
                "story {}",
                file.story_id
            )));
        }
        let story = StoryState::from(file);
        self.content.stories.insert(story.story_id.clone(), story);
        Ok(())
    }

    /// Load the kernel configuration from a RON string
    pub fn load_config_str(&mut self, content: &str) -> Result<()> {
        if self.content.config.is_some() {
            return Err(Error::DuplicateDefinition("kernel config".to_string()));
        }
        self.content.config = Some(KernelConfig::from_ron_str(content)?);
        Ok(())
    }

    /// Load all RON files from a directory, recursing into subdirectories
    ///
    /// Entries are visited in name order so duplicate errors are stable.
    pub fn load_directory(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if !path.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Not a directory: {:?}", path),
            )));
        }

        let mut entries = fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.sort();

        for file_path in entries {
            if file_path.extension().map(|e| e == "ron").unwrap_or(false) {
                self.load_file(&file_path)?;
            } else if file_path.is_dir() {
                self.load_directory(&file_path)?;
            }
        }

        Ok(())
    }

    /// Finish loading and return the content
    pub fn finish(self) -> Content {
        self.content
    }

    /// Get the content loaded so far
    pub fn content(&self) -> &Content {
        &self.content
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}
