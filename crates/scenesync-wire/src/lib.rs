//! SceneSync Wire Format - Type-tagged binary envelope
//!
//! Every payload on the peer channel and on disk is one envelope:
//! - Fixed header (12 bytes): magic, version, payload kind, body length
//! - Body (kind-specific encoding)
//! - SHA-256 digest over header and body
//!
//! The peer channel carries no type hint of its own, so receivers use
//! [`decode_any`], which tries each kind in [`PayloadKind::TRIAL_ORDER`].
//!
//! [`PayloadKind::TRIAL_ORDER`]: scenesync_core::PayloadKind::TRIAL_ORDER

pub mod header;
pub mod envelope;
pub mod payload;
pub mod codec;

pub use header::*;
pub use envelope::*;
pub use payload::*;
pub use codec::*;
