//! SceneSync Test Harness - Simulated devices and peer networks
//!
//! This crate provides:
//! - Chaos links (loss, duplication, reordering)
//! - An in-process mesh implementing the peer transport contract
//! - A scripted tracking engine and an in-memory map store
//! - Multi-device clusters and end-to-end scenarios

pub mod chaos;
pub mod mesh;
pub mod engine;
pub mod store;
pub mod cluster;
pub mod scenarios;
pub mod network_test;

pub use chaos::*;
pub use mesh::*;
pub use engine::*;
pub use store::*;
pub use cluster::*;
