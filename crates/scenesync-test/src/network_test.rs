//! Real network tests
//!
//! Two controllers talking over loopback UDP sockets, each driven by its
//! own `run` task.

use std::net::SocketAddr;

use scenesync_core::SceneResult;
use scenesync_transport::UdpPeerTransport;

/// Two loopback transports that know each other
pub async fn loopback_pair(names: (&str, &str)) -> SceneResult<(UdpPeerTransport, UdpPeerTransport)> {
    let any: SocketAddr = ([127, 0, 0, 1], 0).into();
    let a = UdpPeerTransport::bind(any).await?;
    let b = UdpPeerTransport::bind(any).await?;

    a.connect(b.local_addr(), names.1);
    b.connect(a.local_addr(), names.0);
    Ok((a, b))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use scenesync_core::{Color, Pose, TrackingState};
    use scenesync_runtime::{Controller, ControllerConfig};
    use scenesync_transport::PeerTransport;

    use super::*;
    use crate::{MemoryStore, SimTrackingEngine};

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(150)).await;
    }

    #[tokio::test]
    async fn test_marker_and_snapshot_over_udp() {
        let (ta, tb) = loopback_pair(("alice", "bob")).await.unwrap();
        assert_eq!(ta.connected_peers()[0].display_name, "bob");

        let (ca, ha) = Controller::new(
            SimTrackingEngine::mapped(),
            ta,
            MemoryStore::new(),
            ControllerConfig::default(),
        );
        let (cb, hb) = Controller::new(
            SimTrackingEngine::mapped(),
            tb,
            MemoryStore::new(),
            ControllerConfig::default(),
        );
        let _recv_a = ca.transport().start_receive_loop(ha.clone());
        let _recv_b = cb.transport().start_receive_loop(hb.clone());
        let run_a = tokio::spawn(ca.run());
        let run_b = tokio::spawn(cb.run());

        ha.start().unwrap();
        hb.start().unwrap();
        ha.create_marker(Pose::from_translation(0.0, 0.0, -0.2), Color::RED, 0.05)
            .unwrap();
        settle().await;

        hb.save().unwrap();
        settle().await;

        ha.shutdown().unwrap();
        hb.shutdown().unwrap();
        let ca = run_a.await.unwrap();
        let cb = run_b.await.unwrap();

        // b saw a's marker, then its own save seeded a
        assert_eq!(cb.stats().markers_received, 1);
        assert!(cb.persistence_exists());
        assert_eq!(ca.state(), TrackingState::TrackingSeeded);
        assert_eq!(ca.marker_count(), 0);
    }
}
