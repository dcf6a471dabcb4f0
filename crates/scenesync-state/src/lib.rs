//! SceneSync State Engine - Local spatial state and its reconciliation
//!
//! This crate owns what a device currently shows:
//! - Marker field (render set plus anchor side table)
//! - Current authoritative map snapshot
//! - Session epochs
//! - Fold and replace policies for incoming state

pub mod field;
pub mod reconcile;

pub use field::*;
pub use reconcile::*;
