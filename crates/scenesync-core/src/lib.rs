//! SceneSync Core - Fundamental types and primitives
//!
//! This crate defines the types shared by every SceneSync layer:
//! - Identifiers (MarkerId, PeerId, AnchorId)
//! - Geometry (Pose, Color, ScreenPoint)
//! - Marker records and spatial map snapshots
//! - Payload kinds and session states
//! - Error taxonomy

pub mod id;
pub mod geometry;
pub mod marker;
pub mod snapshot;
pub mod kind;
pub mod session;
pub mod peer;
pub mod error;

pub use id::*;
pub use geometry::*;
pub use marker::*;
pub use snapshot::*;
pub use kind::*;
pub use session::*;
pub use peer::*;
pub use error::*;
