//! Map store - the most recent snapshot at one fixed path
//!
//! Writes go to a `.tmp` sibling first and are renamed over the target, so
//! a failed or interrupted save leaves the previous snapshot intact.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use scenesync_core::{SceneError, SceneResult};

/// File name used when none is configured
pub const DEFAULT_MAP_FILE: &str = "worldMap.dat";

/// Persistence contract for encoded snapshots
pub trait SnapshotStore: Send {
    /// Overwrite the stored snapshot
    fn save(&mut self, bytes: &[u8]) -> SceneResult<()>;

    /// Read the stored snapshot
    fn load(&self) -> SceneResult<Vec<u8>>;

    /// Cheap, side-effect-free existence check
    fn exists(&self) -> bool;
}

/// File-backed snapshot store
#[derive(Debug, Clone)]
pub struct MapStore {
    path: PathBuf,
}

impl MapStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        MapStore { path: path.into() }
    }

    /// Store `file_name` inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>, file_name: &str) -> Self {
        MapStore::new(dir.as_ref().join(file_name))
    }

    /// Store `file_name` in the per-user data directory of this install
    pub fn in_default_location(file_name: &str) -> SceneResult<Self> {
        let dirs = default_dirs()?;
        Ok(MapStore::in_dir(dirs.data_dir(), file_name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for MapStore {
    fn save(&mut self, bytes: &[u8]) -> SceneResult<()> {
        write_atomic(&self.path, bytes)?;
        tracing::debug!(path = %self.path.display(), len = bytes.len(), "map saved");
        Ok(())
    }

    fn load(&self) -> SceneResult<Vec<u8>> {
        fs::read(&self.path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => SceneError::NotFound(self.path.clone()),
            _ => SceneError::io(&self.path, e),
        })
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }
}

pub(crate) fn default_dirs() -> SceneResult<ProjectDirs> {
    ProjectDirs::from("io", "scenesync", "SceneSync")
        .ok_or_else(|| SceneError::Config("no home directory for this user".into()))
}

/// Write `bytes` to `path` via a `.tmp` sibling and rename
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> SceneResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| SceneError::io(parent, e))?;
        }
    }

    let tmp = path.with_extension("tmp");
    let written = File::create(&tmp).and_then(|mut file| {
        file.write_all(bytes)?;
        file.sync_all()
    });

    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(SceneError::io(&tmp, e));
    }

    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        SceneError::io(path, e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MapStore::in_dir(dir.path(), DEFAULT_MAP_FILE);

        assert!(!store.exists());
        store.save(b"first").unwrap();
        assert!(store.exists());
        assert_eq!(store.load().unwrap(), b"first");

        // Overwrite semantics
        store.save(b"second").unwrap();
        assert_eq!(store.load().unwrap(), b"second");
        assert!(!dir.path().join("worldMap.tmp").exists());
    }

    #[test]
    fn test_load_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = MapStore::in_dir(dir.path(), DEFAULT_MAP_FILE);

        assert!(matches!(store.load(), Err(SceneError::NotFound(_))));
    }

    #[test]
    fn test_creates_missing_parent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MapStore::in_dir(dir.path().join("nested/deeper"), DEFAULT_MAP_FILE);

        store.save(&[1, 2, 3]).unwrap();
        assert_eq!(store.load().unwrap(), vec![1u8, 2, 3]);
    }

    #[test]
    fn test_failed_save_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MapStore::in_dir(dir.path(), DEFAULT_MAP_FILE);
        store.save(b"good").unwrap();

        // A directory squatting on the temp path makes the write fail
        fs::create_dir(dir.path().join("worldMap.tmp")).unwrap();

        let result = store.save(b"bad");
        assert!(matches!(result, Err(SceneError::Io { .. })));
        assert_eq!(store.load().unwrap(), b"good");
    }

    #[test]
    fn test_exists_has_no_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        let store = MapStore::in_dir(dir.path().join("never-created"), DEFAULT_MAP_FILE);

        assert!(!store.exists());
        assert!(!dir.path().join("never-created").exists());
    }
}
