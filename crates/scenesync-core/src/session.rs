//! Tracking session states
//!
//! One tracking session is live at a time. Every adoption or reset starts a
//! new session epoch, which is how late callbacks from a torn-down session
//! are recognised and ignored.

use std::fmt;

/// Controller state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum TrackingState {
    #[default]
    Uninitialized,
    /// Tracking without a snapshot seed
    TrackingFresh,
    /// Tracking seeded from a snapshot
    TrackingSeeded,
    /// Engine suspended, no map mutation accepted
    Paused,
}

impl TrackingState {
    #[inline]
    pub fn is_tracking(self) -> bool {
        matches!(self, TrackingState::TrackingFresh | TrackingState::TrackingSeeded)
    }

    pub fn name(self) -> &'static str {
        match self {
            TrackingState::Uninitialized => "uninitialized",
            TrackingState::TrackingFresh => "tracking-fresh",
            TrackingState::TrackingSeeded => "tracking-seeded",
            TrackingState::Paused => "paused",
        }
    }
}

impl fmt::Display for TrackingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How well the engine has mapped the surroundings
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum MappingStatus {
    #[default]
    NotAvailable,
    Limited,
    Extending,
    Mapped,
}

impl MappingStatus {
    /// A snapshot captured in this status is worth keeping
    #[inline]
    pub fn allows_save(self) -> bool {
        matches!(self, MappingStatus::Extending | MappingStatus::Mapped)
    }
}

impl fmt::Display for MappingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MappingStatus::NotAvailable => "not-available",
            MappingStatus::Limited => "limited",
            MappingStatus::Extending => "extending",
            MappingStatus::Mapped => "mapped",
        };
        f.write_str(s)
    }
}

/// Tracking session generation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct SessionEpoch(pub u64);

impl SessionEpoch {
    #[inline]
    pub fn next(self) -> Self {
        SessionEpoch(self.0.wrapping_add(1))
    }
}
