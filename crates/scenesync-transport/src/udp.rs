//! UDP transport for devices on the same LAN
//!
//! Outbound datagrams are queued to a send task that owns the await on the
//! socket, so `broadcast` never drops a datagram because the socket was not
//! yet known to be writable. Messages larger than one datagram are split
//! into fragments and reassembled by the receive loop.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use scenesync_core::{PeerId, PeerInfo, SceneError, SceneResult};

use crate::fragment::{self, Reassembler, MAX_DATAGRAM_SIZE};
use crate::{InboundSink, PeerDirectory, PeerTransport};

/// Outbound queue entry
pub type Outbound = (Bytes, SocketAddr, PeerId);

/// UDP peer transport
///
/// Peers are registered explicitly with `connect`; datagrams from any other
/// address are dropped by the receive loop.
pub struct UdpPeerTransport {
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    peers: PeerDirectory<SocketAddr>,
    outbound: mpsc::UnboundedSender<Outbound>,
    next_message: AtomicU64,
}

impl UdpPeerTransport {
    /// Bind to a local address and start the send task
    pub async fn bind(addr: SocketAddr) -> SceneResult<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| SceneError::TransportError(e.to_string()))?;

        let local_addr = socket
            .local_addr()
            .map_err(|e| SceneError::TransportError(e.to_string()))?;

        let socket = Arc::new(socket);
        let (outbound, rx) = mpsc::unbounded_channel();
        start_send_loop(Arc::clone(&socket), rx);

        Ok(UdpPeerTransport {
            socket,
            local_addr,
            peers: PeerDirectory::new(),
            outbound,
            // Random start so a restarted device never reuses live message ids
            next_message: AtomicU64::new(rand::random()),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Add a peer to the fan-out set
    pub fn connect(&self, addr: SocketAddr, display_name: impl Into<String>) -> PeerId {
        let id = self.peers.insert(addr, display_name);
        tracing::info!(peer = %id, %addr, "peer connected");
        id
    }

    pub fn disconnect(&self, id: PeerId) -> SceneResult<PeerInfo> {
        let info = self
            .peers
            .remove(id)
            .ok_or_else(|| SceneError::UnknownPeer(id.to_string()))?;
        tracing::info!(peer = %id, name = %info.display_name, "peer disconnected");
        Ok(info)
    }

    pub fn directory(&self) -> &PeerDirectory<SocketAddr> {
        &self.peers
    }

    /// Start the background receive loop
    ///
    /// Runs until the sink reports its receiver is gone.
    pub fn start_receive_loop<S: InboundSink>(&self, sink: S) -> JoinHandle<()> {
        let socket = Arc::clone(&self.socket);
        let peers = self.peers.clone();

        tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
            let mut reassembler = Reassembler::new();
            loop {
                match socket.recv_from(&mut buf).await {
                    Ok((len, addr)) => {
                        let Some(from) = peers.lookup(&addr) else {
                            tracing::warn!(%addr, len, "datagram from unknown peer dropped");
                            continue;
                        };
                        let message = match reassembler.accept(addr, &buf[..len]) {
                            Ok(Some(message)) => message,
                            Ok(None) => continue,
                            Err(e) => {
                                tracing::warn!(peer = %from, error = %e, "bad fragment dropped");
                                continue;
                            }
                        };
                        if !sink.deliver(message, from) {
                            break; // Receiver dropped
                        }
                    }
                    Err(e) => {
                        tracing::warn!("UDP receive error: {}", e);
                    }
                }
            }
        })
    }
}

/// Drain the outbound queue onto the socket
///
/// Ends when the transport, and with it the queue sender, is dropped.
fn start_send_loop(socket: Arc<UdpSocket>, mut rx: mpsc::UnboundedReceiver<Outbound>) {
    tokio::spawn(async move {
        while let Some((datagram, addr, peer)) = rx.recv().await {
            if let Err(e) = socket.send_to(&datagram, addr).await {
                tracing::warn!(%peer, %addr, error = %e, "send failed");
            }
        }
    });
}

impl PeerTransport for UdpPeerTransport {
    fn broadcast(&self, payload: &[u8]) -> SceneResult<usize> {
        let message_id = self.next_message.fetch_add(1, Ordering::Relaxed);
        let datagrams = fragment::split(message_id, payload)?;

        let targets = self.peers.targets();
        for (addr, peer) in &targets {
            for datagram in &datagrams {
                self.outbound
                    .send((datagram.clone(), *addr, *peer))
                    .map_err(|_| SceneError::TransportError("send task stopped".into()))?;
            }
        }

        if !targets.is_empty() {
            tracing::trace!(
                message = message_id,
                fragments = datagrams.len(),
                peers = targets.len(),
                "payload queued"
            );
        }
        Ok(targets.len())
    }

    fn connected_peers(&self) -> Vec<PeerInfo> {
        self.peers.peers()
    }

    fn has_peers(&self) -> bool {
        !self.peers.is_empty()
    }
}
