//! Payload and anchor kinds
//!
//! Two payload kinds share one peer channel:
//! - Snapshot: a whole spatial map, replaces local tracking state
//! - Marker: one drawing, appended to the render set

use std::fmt;

/// Payload kind, carried as the type tag of every wire envelope
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PayloadKind {
    Snapshot = 0x01,
    Marker = 0x02,
}

impl PayloadKind {
    /// Order in which an untagged-at-the-channel payload is tried
    pub const TRIAL_ORDER: [PayloadKind; 2] = [PayloadKind::Snapshot, PayloadKind::Marker];

    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(PayloadKind::Snapshot),
            0x02 => Some(PayloadKind::Marker),
            _ => None,
        }
    }

    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            PayloadKind::Snapshot => "snapshot",
            PayloadKind::Marker => "marker",
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of anchor registered with the tracking engine
///
/// The engine reports anchors of every kind through the same callbacks;
/// only `Marker` anchors are backed by a record in the render set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AnchorKind {
    Marker,
    Plane,
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_kind_bytes() {
        assert_eq!(PayloadKind::from_byte(0x01), Some(PayloadKind::Snapshot));
        assert_eq!(PayloadKind::from_byte(0x02), Some(PayloadKind::Marker));
        assert_eq!(PayloadKind::from_byte(0x00), None);
    }

    #[test]
    fn test_trial_order_snapshot_first() {
        assert_eq!(PayloadKind::TRIAL_ORDER[0], PayloadKind::Snapshot);
    }
}
