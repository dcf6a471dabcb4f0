//! Tracking engine contract
//!
//! The engine owns camera tracking and world mapping. The controller only
//! asks it to start, pause, capture or adopt a map, project touches and
//! register anchors. Results that arrive later come back through a
//! `CaptureReply` or a `ControllerHandle`, never by calling into the
//! controller directly.

use scenesync_core::{
    AnchorId, AnchorKind, MapSnapshot, MappingStatus, Pose, SceneError, SceneResult, ScreenPoint,
    SessionEpoch,
};

use crate::handle::{Input, InputSender};

/// Tracking engine driven by the controller
pub trait TrackingEngine: Send {
    /// Start or resume tracking without discarding the current map
    fn start(&mut self);

    /// Suspend tracking
    fn pause(&mut self);

    /// Restart tracking, seeded with `seed` or from scratch
    fn adopt_snapshot(&mut self, seed: Option<&MapSnapshot>);

    /// Begin capturing the current map; the result goes to `reply`
    ///
    /// May complete before returning, much later, or never.
    fn capture_snapshot(&mut self, reply: CaptureReply);

    /// World pose under a screen point, if one can be found
    fn project_touch(&self, point: ScreenPoint) -> Option<Pose>;

    /// Register an anchor and return its engine-assigned identity
    fn add_anchor(&mut self, pose: Pose, kind: AnchorKind) -> AnchorId;

    fn mapping_status(&self) -> MappingStatus;
}

/// Identifies one save request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CaptureTicket {
    /// Session epoch when the capture was requested
    pub epoch: SessionEpoch,
    pub request_id: u64,
}

/// One-shot completion for a snapshot capture
#[derive(Debug)]
pub struct CaptureReply {
    ticket: CaptureTicket,
    tx: InputSender,
}

impl CaptureReply {
    pub(crate) fn new(ticket: CaptureTicket, tx: InputSender) -> Self {
        CaptureReply { ticket, tx }
    }

    pub fn ticket(&self) -> CaptureTicket {
        self.ticket
    }

    /// Hand the capture result back to the controller
    pub fn complete(self, result: SceneResult<MapSnapshot>) {
        let ticket = self.ticket;
        if self.tx.send(Input::CaptureCompleted { ticket, result }).is_err() {
            tracing::debug!(request = ticket.request_id, "capture finished after controller shut down");
        }
    }

    /// Complete with whatever the engine produced; nothing counts as a failure
    pub fn complete_with(self, snapshot: Option<MapSnapshot>) {
        let result =
            snapshot.ok_or_else(|| SceneError::CaptureFailed("engine produced no map".into()));
        self.complete(result);
    }

    pub fn fail(self, reason: impl Into<String>) {
        self.complete(Err(SceneError::CaptureFailed(reason.into())));
    }
}

/// Anchor callback from the engine
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AnchorEvent {
    Added {
        anchor: AnchorId,
        kind: AnchorKind,
        pose: Pose,
    },
    Updated {
        anchor: AnchorId,
        kind: AnchorKind,
        pose: Pose,
    },
}

impl AnchorEvent {
    pub fn anchor(&self) -> AnchorId {
        match self {
            AnchorEvent::Added { anchor, .. } | AnchorEvent::Updated { anchor, .. } => *anchor,
        }
    }

    pub fn kind(&self) -> AnchorKind {
        match self {
            AnchorEvent::Added { kind, .. } | AnchorEvent::Updated { kind, .. } => *kind,
        }
    }

    pub fn pose(&self) -> Pose {
        match self {
            AnchorEvent::Added { pose, .. } | AnchorEvent::Updated { pose, .. } => *pose,
        }
    }
}
