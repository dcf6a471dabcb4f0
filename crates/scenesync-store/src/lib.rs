//! SceneSync Store - On-device persistence
//!
//! This crate provides:
//! - Map store (one snapshot file per device, atomically replaced)
//! - Session flag store (first launch and similar per-install state)

pub mod map_store;
pub mod flags;

pub use map_store::*;
pub use flags::*;
