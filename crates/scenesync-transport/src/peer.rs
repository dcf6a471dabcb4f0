//! Transport contract

use std::sync::Arc;

use scenesync_core::{PeerId, PeerInfo, SceneResult};

/// Outbound side of a peer channel
///
/// Delivery is unordered and at-least-once to whoever is connected when
/// the call is made. Membership may change at any time.
pub trait PeerTransport: Send + Sync {
    /// Send `payload` to every connected peer, returning how many were reached
    fn broadcast(&self, payload: &[u8]) -> SceneResult<usize>;

    /// Current peer set
    fn connected_peers(&self) -> Vec<PeerInfo>;

    fn has_peers(&self) -> bool {
        !self.connected_peers().is_empty()
    }
}

impl<T: PeerTransport + ?Sized> PeerTransport for Arc<T> {
    fn broadcast(&self, payload: &[u8]) -> SceneResult<usize> {
        (**self).broadcast(payload)
    }

    fn connected_peers(&self) -> Vec<PeerInfo> {
        (**self).connected_peers()
    }

    fn has_peers(&self) -> bool {
        (**self).has_peers()
    }
}

/// Inbound side: where a transport hands received payloads
///
/// Called from transport tasks, never from the owner of the session state.
/// Implementations marshal the payload onto the owner.
pub trait InboundSink: Send + Sync + 'static {
    /// Deliver one payload; returns false once the receiver is gone
    fn deliver(&self, payload: Vec<u8>, from: PeerId) -> bool;
}

impl InboundSink for tokio::sync::mpsc::UnboundedSender<(Vec<u8>, PeerId)> {
    fn deliver(&self, payload: Vec<u8>, from: PeerId) -> bool {
        self.send((payload, from)).is_ok()
    }
}

impl<S: InboundSink + ?Sized> InboundSink for Arc<S> {
    fn deliver(&self, payload: Vec<u8>, from: PeerId) -> bool {
        (**self).deliver(payload, from)
    }
}
