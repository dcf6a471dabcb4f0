//! In-memory map store with fault injection
//!
//! Clones share one "disk", so a device can be torn down and rebuilt
//! against the same saved map.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use scenesync_core::{SceneError, SceneResult};
use scenesync_store::SnapshotStore;

#[derive(Debug, Default)]
struct Disk {
    bytes: Option<Vec<u8>>,
    fail_saves: bool,
    fail_loads: bool,
    saves: u64,
}

/// Shared in-memory snapshot store
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    disk: Arc<Mutex<Disk>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Make every save fail with an I/O error
    pub fn fail_saves(&self, fail: bool) {
        self.disk.lock().fail_saves = fail;
    }

    /// Make every load fail with an I/O error
    pub fn fail_loads(&self, fail: bool) {
        self.disk.lock().fail_loads = fail;
    }

    /// Successful saves so far
    pub fn saves(&self) -> u64 {
        self.disk.lock().saves
    }

    pub fn contents(&self) -> Option<Vec<u8>> {
        self.disk.lock().bytes.clone()
    }

    /// Overwrite the stored bytes directly, bypassing the controller
    pub fn put(&self, bytes: Vec<u8>) {
        self.disk.lock().bytes = Some(bytes);
    }

    fn path() -> PathBuf {
        PathBuf::from("memory://worldMap.dat")
    }

    fn injected() -> SceneError {
        SceneError::io(
            Self::path(),
            std::io::Error::new(std::io::ErrorKind::Other, "injected fault"),
        )
    }
}

impl SnapshotStore for MemoryStore {
    fn save(&mut self, bytes: &[u8]) -> SceneResult<()> {
        let mut disk = self.disk.lock();
        if disk.fail_saves {
            return Err(Self::injected());
        }
        disk.bytes = Some(bytes.to_vec());
        disk.saves += 1;
        Ok(())
    }

    fn load(&self) -> SceneResult<Vec<u8>> {
        let disk = self.disk.lock();
        if disk.fail_loads {
            return Err(Self::injected());
        }
        disk.bytes
            .clone()
            .ok_or_else(|| SceneError::NotFound(Self::path()))
    }

    fn exists(&self) -> bool {
        self.disk.lock().bytes.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_disk() {
        let mut a = MemoryStore::new();
        let b = a.clone();

        a.save(b"map").unwrap();
        assert!(b.exists());
        assert_eq!(b.load().unwrap(), b"map");
    }

    #[test]
    fn test_injected_save_fault_keeps_previous() {
        let mut store = MemoryStore::new();
        store.save(b"old").unwrap();
        store.fail_saves(true);

        let err = store.save(b"new").unwrap_err();
        assert!(err.is_io_error());
        assert_eq!(store.contents().unwrap(), b"old");
        assert_eq!(store.saves(), 1);
    }
}
