//! Connected peer set

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;
use rand::Rng;

use scenesync_core::{PeerId, PeerInfo};

#[derive(Debug)]
struct Inner<A> {
    peers: HashMap<PeerId, (A, PeerInfo)>,
    by_addr: HashMap<A, PeerId>,
}

/// Shared, cloneable peer directory
///
/// `A` is whatever the transport needs to reach a peer (a socket address,
/// a channel endpoint). Clones share the same table.
#[derive(Debug)]
pub struct PeerDirectory<A> {
    inner: Arc<RwLock<Inner<A>>>,
}

impl<A> Clone for PeerDirectory<A> {
    fn clone(&self) -> Self {
        PeerDirectory {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: Clone + Eq + Hash> PeerDirectory<A> {
    pub fn new() -> Self {
        PeerDirectory {
            inner: Arc::new(RwLock::new(Inner {
                peers: HashMap::new(),
                by_addr: HashMap::new(),
            })),
        }
    }

    /// Register a peer under a fresh identity
    ///
    /// Re-registering an address keeps its identity and updates the name.
    pub fn insert(&self, addr: A, display_name: impl Into<String>) -> PeerId {
        let display_name = display_name.into();
        let mut inner = self.inner.write();

        if let Some(&id) = inner.by_addr.get(&addr) {
            if let Some((_, info)) = inner.peers.get_mut(&id) {
                info.display_name = display_name;
            }
            return id;
        }

        let mut rng = rand::thread_rng();
        let id = loop {
            let candidate = PeerId::new(rng.gen_range(1..=u64::MAX));
            if !inner.peers.contains_key(&candidate) {
                break candidate;
            }
        };

        inner.by_addr.insert(addr.clone(), id);
        inner.peers.insert(id, (addr, PeerInfo::new(id, display_name)));
        id
    }

    pub fn remove(&self, id: PeerId) -> Option<PeerInfo> {
        let mut inner = self.inner.write();
        let (addr, info) = inner.peers.remove(&id)?;
        inner.by_addr.remove(&addr);
        Some(info)
    }

    pub fn lookup(&self, addr: &A) -> Option<PeerId> {
        self.inner.read().by_addr.get(addr).copied()
    }

    pub fn address_of(&self, id: PeerId) -> Option<A> {
        self.inner.read().peers.get(&id).map(|(addr, _)| addr.clone())
    }

    /// Snapshot of (address, identity) pairs for fan-out
    pub fn targets(&self) -> Vec<(A, PeerId)> {
        self.inner
            .read()
            .peers
            .iter()
            .map(|(&id, (addr, _))| (addr.clone(), id))
            .collect()
    }

    /// Snapshot of (address, peer) pairs
    pub fn entries(&self) -> Vec<(A, PeerInfo)> {
        self.inner
            .read()
            .peers
            .values()
            .map(|(addr, info)| (addr.clone(), info.clone()))
            .collect()
    }

    pub fn peers(&self) -> Vec<PeerInfo> {
        let mut peers: Vec<PeerInfo> = self
            .inner
            .read()
            .peers
            .values()
            .map(|(_, info)| info.clone())
            .collect();
        peers.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        peers
    }

    pub fn len(&self) -> usize {
        self.inner.read().peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().peers.is_empty()
    }
}

impl<A: Clone + Eq + Hash> Default for PeerDirectory<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_lookup() {
        let dir: PeerDirectory<u16> = PeerDirectory::new();
        let a = dir.insert(1, "alice's phone");
        let b = dir.insert(2, "bob's tablet");

        assert_ne!(a, b);
        assert!(!a.is_local());
        assert_eq!(dir.lookup(&1), Some(a));
        assert_eq!(dir.address_of(b), Some(2));
        assert_eq!(dir.len(), 2);
    }

    #[test]
    fn test_reinsert_keeps_identity() {
        let dir: PeerDirectory<u16> = PeerDirectory::new();
        let a = dir.insert(1, "old name");
        let again = dir.insert(1, "new name");

        assert_eq!(a, again);
        assert_eq!(dir.peers()[0].display_name, "new name");
    }

    #[test]
    fn test_remove_is_shared_across_clones() {
        let dir: PeerDirectory<u16> = PeerDirectory::new();
        let view = dir.clone();
        let a = dir.insert(7, "carol");

        assert_eq!(view.remove(a).unwrap().display_name, "carol");
        assert!(dir.is_empty());
        assert_eq!(dir.lookup(&7), None);
    }
}
