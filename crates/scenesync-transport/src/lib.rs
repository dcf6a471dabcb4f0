//! SceneSync Transport - Peer fan-out
//!
//! This crate provides:
//! - The `PeerTransport` contract the controller broadcasts through
//! - The `InboundSink` seam inbound payloads are delivered into
//! - `PeerDirectory`, the connected peer set
//! - A UDP implementation for devices on the same LAN, with fragmentation
//!   for payloads larger than one datagram

pub mod peer;
pub mod directory;
pub mod fragment;
pub mod udp;

pub use peer::*;
pub use directory::*;
pub use fragment::{Reassembler, MAX_DATAGRAM_SIZE, MAX_MESSAGE_SIZE};
pub use udp::*;
