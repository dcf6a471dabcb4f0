//! Input marshaling
//!
//! Transport tasks, engine callbacks and the UI all talk to the controller
//! through a `ControllerHandle`. Inputs are queued and applied on the
//! controller one at a time, in arrival order.

use tokio::sync::mpsc;

use scenesync_core::{
    Color, MapSnapshot, PeerId, Pose, SceneError, SceneResult, ScreenPoint,
};
use scenesync_transport::InboundSink;

use crate::engine::{AnchorEvent, CaptureTicket};

pub(crate) type InputSender = mpsc::UnboundedSender<Input>;

/// Receiving end owned by the controller
pub type Inbox = mpsc::UnboundedReceiver<Input>;

/// User-level commands
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Start,
    Pause,
    Reset,
    CreateMarker { pose: Pose, color: Color, size: f32 },
    CreateMarkerAtTouch { point: ScreenPoint, color: Color, size: f32 },
    Save,
    Load,
    Shutdown,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Pause => "pause",
            Command::Reset => "reset",
            Command::CreateMarker { .. } => "create marker",
            Command::CreateMarkerAtTouch { .. } => "create marker at touch",
            Command::Save => "save",
            Command::Load => "load",
            Command::Shutdown => "shutdown",
        }
    }
}

/// Everything the controller reacts to
#[derive(Debug)]
pub enum Input {
    Command(Command),
    Inbound { payload: Vec<u8>, from: PeerId },
    CaptureCompleted {
        ticket: CaptureTicket,
        result: SceneResult<MapSnapshot>,
    },
    Anchor(AnchorEvent),
}

/// Cloneable, thread-safe entry point into a controller
#[derive(Clone, Debug)]
pub struct ControllerHandle {
    tx: InputSender,
}

impl ControllerHandle {
    pub(crate) fn new(tx: InputSender) -> Self {
        ControllerHandle { tx }
    }

    /// Queue an input
    pub fn send(&self, input: Input) -> SceneResult<()> {
        self.tx.send(input).map_err(|_| SceneError::ControllerClosed)
    }

    pub fn command(&self, command: Command) -> SceneResult<()> {
        self.send(Input::Command(command))
    }

    pub fn start(&self) -> SceneResult<()> {
        self.command(Command::Start)
    }

    pub fn pause(&self) -> SceneResult<()> {
        self.command(Command::Pause)
    }

    pub fn reset(&self) -> SceneResult<()> {
        self.command(Command::Reset)
    }

    pub fn save(&self) -> SceneResult<()> {
        self.command(Command::Save)
    }

    pub fn load(&self) -> SceneResult<()> {
        self.command(Command::Load)
    }

    pub fn shutdown(&self) -> SceneResult<()> {
        self.command(Command::Shutdown)
    }

    pub fn create_marker(&self, pose: Pose, color: Color, size: f32) -> SceneResult<()> {
        self.command(Command::CreateMarker { pose, color, size })
    }

    pub fn create_marker_at_touch(&self, point: ScreenPoint, color: Color, size: f32) -> SceneResult<()> {
        self.command(Command::CreateMarkerAtTouch { point, color, size })
    }

    /// Payload received from a peer
    pub fn inbound(&self, payload: Vec<u8>, from: PeerId) -> SceneResult<()> {
        self.send(Input::Inbound { payload, from })
    }

    /// Anchor callback from the tracking engine
    pub fn anchor_event(&self, event: AnchorEvent) -> SceneResult<()> {
        self.send(Input::Anchor(event))
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl InboundSink for ControllerHandle {
    fn deliver(&self, payload: Vec<u8>, from: PeerId) -> bool {
        self.inbound(payload, from).is_ok()
    }
}
