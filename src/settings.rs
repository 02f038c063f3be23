//! Scene Settings
//!
//! Sizing and traversal limits for a [`Scene`](crate::scene::Scene).
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use thirty::settings::SceneSettings;
//!
//! // Defaults suit small scenes
//! let settings = SceneSettings::default();
//!
//! // Or from JSON; missing fields keep their defaults
//! let settings = SceneSettings::from_json_str(r#"{ "max_lights": 4 }"#)?;
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::MAX_ALIGNMENT;
use crate::errors::{Result, ThirtyError};

/// Configuration of one scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    // === Storage ===
    /// Initial capacity of the object array.
    pub initial_object_capacity: usize,

    /// Initial byte capacity of the component record store.
    pub initial_record_capacity: usize,

    /// Alignment of every component record. Must be a power of two between
    /// 4 and 16.
    pub record_alignment: usize,

    // === Traversal ===
    /// Deepest object nesting accepted by the tree parser and the frame
    /// walk.
    pub max_tree_depth: usize,

    /// Number of light uniform slots per shader. Extra lights are ignored.
    pub max_lights: usize,

    // === Asset loading ===
    /// Directory scene files and textures are resolved against.
    pub assets_root: PathBuf,

    /// Worker threads of the file reader built by
    /// [`AsyncFileReader::from_settings`](crate::io::AsyncFileReader::from_settings).
    pub io_workers: usize,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            initial_object_capacity: 16,
            initial_record_capacity: 4096,
            record_alignment: 16,
            max_tree_depth: 32,
            max_lights: 8,
            assets_root: PathBuf::from("assets"),
            io_workers: 2,
        }
    }
}

impl SceneSettings {
    /// Parses and validates settings from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        let align = self.record_alignment;
        if !align.is_power_of_two() || !(4..=MAX_ALIGNMENT).contains(&align) {
            return Err(ThirtyError::InvalidSettings(format!(
                "record_alignment must be a power of two in 4..={MAX_ALIGNMENT}, got {align}"
            )));
        }
        if self.max_tree_depth == 0 {
            return Err(ThirtyError::InvalidSettings(
                "max_tree_depth must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
