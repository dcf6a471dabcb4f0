//! What the controller tells the outside world

use std::fmt;

use scenesync_core::{MappingStatus, MarkerId, PeerId, PeerInfo, TrackingState};

/// User-visible outcome, drained by the UI
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    MarkerPlaced(MarkerId),
    MarkerReceived { id: MarkerId, from: PeerId },
    SnapshotSaved { len: usize, peers: usize },
    SaveFailed(String),
    SnapshotLoaded,
    LoadFailed(String),
    SnapshotReceived { from: PeerId, orphaned: usize },
    PayloadDiscarded { from: PeerId },
    SessionReset { orphaned: usize },
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::MarkerPlaced(id) => write!(f, "Placed marker {}", id),
            Notification::MarkerReceived { id, from } => {
                write!(f, "Received marker {} from {}", id, from)
            }
            Notification::SnapshotSaved { len, peers: 0 } => write!(f, "Map saved ({} bytes)", len),
            Notification::SnapshotSaved { len, peers } => {
                write!(f, "Map saved ({} bytes) and shared with {} peers", len, peers)
            }
            Notification::SaveFailed(reason) => write!(f, "Could not save map: {}", reason),
            Notification::SnapshotLoaded => write!(f, "Map loaded"),
            Notification::LoadFailed(reason) => write!(f, "Could not load map: {}", reason),
            Notification::SnapshotReceived { from, .. } => write!(f, "Received map from {}", from),
            Notification::PayloadDiscarded { from } => {
                write!(f, "Ignored unreadable message from {}", from)
            }
            Notification::SessionReset { .. } => write!(f, "Session reset"),
        }
    }
}

/// Controller counters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ControllerStats {
    pub inputs: u64,
    pub markers_created: u64,
    pub markers_received: u64,
    pub duplicates_dropped: u64,
    pub snapshots_adopted: u64,
    pub saves_succeeded: u64,
    pub saves_failed: u64,
    pub broadcasts_sent: u64,
    pub broadcasts_skipped: u64,
    pub broadcasts_failed: u64,
    pub payloads_discarded: u64,
    pub stale_captures_dropped: u64,
    pub dropped_while_paused: u64,
}

/// Status line data for the UI
#[derive(Clone, Debug, PartialEq)]
pub struct StatusReport {
    pub tracking: TrackingState,
    pub mapping: MappingStatus,
    pub peers: Vec<PeerInfo>,
    pub markers: usize,
    pub has_saved_map: bool,
    /// Whether a save would be attempted right now
    pub can_save: bool,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tracking: {}, mapping: {}, {} markers",
            self.tracking, self.mapping, self.markers
        )?;
        if !self.peers.is_empty() {
            let names: Vec<&str> = self.peers.iter().map(|p| p.display_name.as_str()).collect();
            write!(f, ", connected with {}", names.join(", "))?;
        }
        Ok(())
    }
}
