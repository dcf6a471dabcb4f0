//! SceneSync Runtime - The reconciliation controller
//!
//! Every mutation of the marker field and the current snapshot happens on
//! the controller, one input at a time:
//! 1. UI commands (start, pause, reset, place marker, save, load)
//! 2. Inbound peer payloads, trial-decoded and dispatched by kind
//! 3. Snapshot capture completions, checked against the session epoch
//! 4. Anchor callbacks from the tracking engine
//!
//! Other threads only ever hold a `ControllerHandle`, which queues inputs.

pub mod config;
pub mod controller;
pub mod engine;
pub mod handle;
pub mod report;
pub mod telemetry;

pub use config::*;
pub use controller::*;
pub use engine::*;
pub use handle::*;
pub use report::*;
pub use telemetry::{init_tracing, LogFormat};
