//! Session flags - small per-install state such as "first launch"
//!
//! Handed to whoever needs it instead of living in a process-wide
//! singleton, so tests and multiple sessions never share it by accident.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use scenesync_core::{SceneError, SceneResult};

use crate::map_store::{default_dirs, write_atomic};

/// File name for the flag file in the default location
pub const DEFAULT_FLAGS_FILE: &str = "flags.json";

/// Persisted flag values
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionFlags {
    /// Onboarding has not been shown yet
    pub first_launch: bool,
}

impl Default for SessionFlags {
    fn default() -> Self {
        SessionFlags { first_launch: true }
    }
}

/// Init-once, read/write-many flag storage
pub trait FlagStore: Send {
    fn flags(&self) -> &SessionFlags;

    fn update(&mut self, flags: SessionFlags) -> SceneResult<()>;

    fn first_launch(&self) -> bool {
        self.flags().first_launch
    }

    fn set_first_launch(&mut self, value: bool) -> SceneResult<()> {
        let mut flags = self.flags().clone();
        flags.first_launch = value;
        self.update(flags)
    }
}

/// In-memory flags, lost when dropped
#[derive(Debug, Default)]
pub struct MemoryFlagStore {
    flags: SessionFlags,
}

impl MemoryFlagStore {
    pub fn new() -> Self {
        MemoryFlagStore::default()
    }
}

impl FlagStore for MemoryFlagStore {
    fn flags(&self) -> &SessionFlags {
        &self.flags
    }

    fn update(&mut self, flags: SessionFlags) -> SceneResult<()> {
        self.flags = flags;
        Ok(())
    }
}

/// JSON file of flags
#[derive(Debug)]
pub struct FileFlagStore {
    path: PathBuf,
    flags: SessionFlags,
}

impl FileFlagStore {
    /// Open the flag file, falling back to defaults when it is missing or unreadable
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let flags = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "unreadable flag file, using defaults");
                SessionFlags::default()
            }),
            Err(_) => SessionFlags::default(),
        };
        FileFlagStore { path, flags }
    }

    pub fn in_default_location() -> SceneResult<Self> {
        let dirs = default_dirs()?;
        Ok(FileFlagStore::open(dirs.config_dir().join(DEFAULT_FLAGS_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FlagStore for FileFlagStore {
    fn flags(&self) -> &SessionFlags {
        &self.flags
    }

    fn update(&mut self, flags: SessionFlags) -> SceneResult<()> {
        let bytes = serde_json::to_vec_pretty(&flags)
            .map_err(|e| SceneError::Config(format!("cannot serialize flags: {}", e)))?;
        write_atomic(&self.path, &bytes)?;
        self.flags = flags;
        Ok(())
    }
}
