//! In-process peer mesh
//!
//! Devices register with a shared `MeshNetwork`, connect pairwise, and get a
//! `MeshTransport` each. Broadcasts go into per-direction chaos links and
//! reach the receiving device's sink only when the network is pumped, which
//! stands in for "arrives later, on another thread".

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;

use scenesync_core::{PeerId, PeerInfo, SceneResult};
use scenesync_transport::{InboundSink, PeerDirectory, PeerTransport};

use crate::chaos::{ChaosConfig, ChaosLink, ChaosStats};

struct Endpoint {
    name: String,
    sink: Option<Box<dyn InboundSink>>,
    /// Peers this device currently sees, keyed by their mesh identity
    peers: PeerDirectory<PeerId>,
    broadcast_calls: u64,
}

struct MeshInner {
    config: ChaosConfig,
    endpoints: HashMap<PeerId, Endpoint>,
    links: HashMap<(PeerId, PeerId), ChaosLink>,
    next_id: u64,
    seed: u64,
}

/// Shared in-process network
#[derive(Clone)]
pub struct MeshNetwork {
    inner: Arc<Mutex<MeshInner>>,
}

impl MeshNetwork {
    pub fn new(config: ChaosConfig) -> Self {
        Self::with_seed(config, 0)
    }

    pub fn with_seed(config: ChaosConfig, seed: u64) -> Self {
        MeshNetwork {
            inner: Arc::new(Mutex::new(MeshInner {
                config,
                endpoints: HashMap::new(),
                links: HashMap::new(),
                next_id: 1,
                seed,
            })),
        }
    }

    /// Add a device and return its transport
    pub fn join(&self, name: impl Into<String>) -> MeshTransport {
        let mut inner = self.inner.lock();
        let me = PeerId::new(inner.next_id);
        inner.next_id += 1;
        inner.endpoints.insert(
            me,
            Endpoint {
                name: name.into(),
                sink: None,
                peers: PeerDirectory::new(),
                broadcast_calls: 0,
            },
        );

        MeshTransport {
            network: self.clone(),
            me,
        }
    }

    /// Where payloads addressed to `device` are delivered
    pub fn attach(&self, device: PeerId, sink: impl InboundSink) {
        if let Some(endpoint) = self.inner.lock().endpoints.get_mut(&device) {
            endpoint.sink = Some(Box::new(sink));
        }
    }

    /// Make `a` and `b` see each other
    pub fn connect(&self, a: PeerId, b: PeerId) {
        let mut inner = self.inner.lock();
        let (Some(name_a), Some(name_b)) = (
            inner.endpoints.get(&a).map(|e| e.name.clone()),
            inner.endpoints.get(&b).map(|e| e.name.clone()),
        ) else {
            return;
        };

        if let Some(endpoint) = inner.endpoints.get_mut(&a) {
            endpoint.peers.insert(b, name_b);
        }
        if let Some(endpoint) = inner.endpoints.get_mut(&b) {
            endpoint.peers.insert(a, name_a);
        }
    }

    /// Connect every pair of devices
    pub fn connect_all(&self) {
        let ids: BTreeSet<PeerId> = self.inner.lock().endpoints.keys().copied().collect();
        for &a in &ids {
            for &b in ids.range(a..).skip(1) {
                self.connect(a, b);
            }
        }
    }

    pub fn disconnect(&self, a: PeerId, b: PeerId) {
        let inner = self.inner.lock();
        for (me, other) in [(a, b), (b, a)] {
            if let Some(endpoint) = inner.endpoints.get(&me) {
                if let Some(id) = endpoint.peers.lookup(&other) {
                    endpoint.peers.remove(id);
                }
            }
        }
    }

    /// Deliver everything in flight; returns how many payloads arrived
    pub fn pump(&self) -> usize {
        let mut inner = self.inner.lock();
        let MeshInner {
            endpoints, links, ..
        } = &mut *inner;

        let mut delivered = 0;
        for (&(from, to), link) in links.iter_mut() {
            let payloads = link.drain();
            let Some(endpoint) = endpoints.get(&to) else {
                continue;
            };
            // Payloads from a peer that has since disconnected are lost
            let (Some(sink), Some(_)) = (&endpoint.sink, endpoint.peers.lookup(&from)) else {
                continue;
            };
            for payload in payloads {
                if sink.deliver(payload, from) {
                    delivered += 1;
                }
            }
        }
        delivered
    }

    pub fn in_flight(&self) -> usize {
        self.inner.lock().links.values().map(|l| l.in_flight()).sum()
    }

    /// How often `device` called `broadcast`
    pub fn broadcast_calls(&self, device: PeerId) -> u64 {
        self.inner
            .lock()
            .endpoints
            .get(&device)
            .map_or(0, |e| e.broadcast_calls)
    }

    /// Link statistics summed over every link
    pub fn stats(&self) -> ChaosStats {
        let inner = self.inner.lock();
        inner
            .links
            .values()
            .map(|l| l.stats())
            .fold(ChaosStats::default(), |mut acc, s| {
                acc.sent += s.sent;
                acc.delivered += s.delivered;
                acc.lost += s.lost;
                acc.reordered += s.reordered;
                acc.duplicated += s.duplicated;
                acc
            })
    }
}

/// One device's view of the mesh
#[derive(Clone)]
pub struct MeshTransport {
    network: MeshNetwork,
    me: PeerId,
}

impl MeshTransport {
    /// Identity of this device on the mesh
    pub fn id(&self) -> PeerId {
        self.me
    }

    pub fn network(&self) -> &MeshNetwork {
        &self.network
    }
}

impl PeerTransport for MeshTransport {
    fn broadcast(&self, payload: &[u8]) -> SceneResult<usize> {
        let mut inner = self.network.inner.lock();
        let targets = match inner.endpoints.get_mut(&self.me) {
            Some(endpoint) => {
                endpoint.broadcast_calls += 1;
                endpoint.peers.targets()
            }
            None => return Ok(0),
        };

        let MeshInner {
            links, config, seed, ..
        } = &mut *inner;
        for (to, _) in &targets {
            let link = links.entry((self.me, *to)).or_insert_with(|| {
                *seed += 1;
                ChaosLink::new(config.clone(), *seed)
            });
            link.send(payload.to_vec());
        }

        Ok(targets.len())
    }

    fn connected_peers(&self) -> Vec<PeerInfo> {
        let inner = self.network.inner.lock();
        let Some(endpoint) = inner.endpoints.get(&self.me) else {
            return Vec::new();
        };

        // Report mesh identities, which is what inbound payloads carry
        let mut peers: Vec<PeerInfo> = endpoint
            .peers
            .entries()
            .into_iter()
            .map(|(mesh_id, info)| PeerInfo::new(mesh_id, info.display_name))
            .collect();
        peers.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        peers
    }
}
