//! Controller configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use scenesync_core::{SceneError, SceneResult};
use scenesync_store::{MapStore, DEFAULT_MAP_FILE};

/// Controller configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Drop received markers whose identity is already shown
    pub dedupe_markers: bool,
    /// Refuse to save until the engine reports an extending or mapped map
    pub require_mapping_for_save: bool,
    /// Largest envelope body accepted or produced
    pub max_payload_size: usize,
    /// File name of the saved map
    pub map_file_name: String,
    /// Directory for the saved map; the per-user data directory when unset
    pub data_dir: Option<PathBuf>,
    /// Oldest notifications are dropped beyond this
    pub max_notifications: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            dedupe_markers: false,
            require_mapping_for_save: true,
            max_payload_size: 16 * 1024 * 1024,
            map_file_name: DEFAULT_MAP_FILE.to_string(),
            data_dir: None,
            max_notifications: 64,
        }
    }
}

impl ControllerConfig {
    /// Read a JSON config file; missing keys take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> SceneResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| SceneError::io(path, e))?;
        let config: ControllerConfig = serde_json::from_slice(&bytes)
            .map_err(|e| SceneError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SceneResult<()> {
        if self.max_payload_size == 0 {
            return Err(SceneError::Config("max_payload_size must be positive".into()));
        }
        if self.map_file_name.is_empty() {
            return Err(SceneError::Config("map_file_name must not be empty".into()));
        }
        Ok(())
    }

    /// Map store at the configured location
    pub fn open_store(&self) -> SceneResult<MapStore> {
        match &self.data_dir {
            Some(dir) => Ok(MapStore::in_dir(dir, &self.map_file_name)),
            None => MapStore::in_default_location(&self.map_file_name),
        }
    }
}
