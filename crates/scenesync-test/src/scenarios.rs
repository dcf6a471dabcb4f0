//! End-to-end scenarios
//!
//! Multi-device runs over the in-process mesh:
//! - Marker propagation and replace semantics
//! - Save, restart, load
//! - Capture failures and stale captures
//! - Malformed payloads
//! - Unordered, duplicating links
