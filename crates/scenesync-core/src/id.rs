//! Identity types for SceneSync
//!
//! All identifiers are 64-bit for wire efficiency. Marker identities are
//! random so that two devices placing markers at the same instant never
//! collide in practice.

use std::fmt;

use rand::Rng;

/// Marker identity - assigned once when the marker is created
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct MarkerId(pub u64);

impl MarkerId {
    pub const ZERO: MarkerId = MarkerId(0);

    #[inline]
    pub fn new(id: u64) -> Self {
        MarkerId(id)
    }

    /// Fresh random identity (never zero)
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        MarkerId(rng.gen_range(1..=u64::MAX))
    }

    #[inline]
    pub fn to_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    #[inline]
    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        MarkerId(u64::from_le_bytes(bytes))
    }
}

impl fmt::Debug for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Marker({:016x})", self.0)
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Peer identity - assigned by the transport when a peer connects
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct PeerId(pub u64);

impl PeerId {
    /// The local device, used as the origin of locally created state
    pub const LOCAL: PeerId = PeerId(0);

    #[inline]
    pub fn new(id: u64) -> Self {
        PeerId(id)
    }

    #[inline]
    pub fn is_local(self) -> bool {
        self == PeerId::LOCAL
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_local() {
            write!(f, "Peer(local)")
        } else {
            write!(f, "Peer({:016x})", self.0)
        }
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Anchor identity - assigned by the tracking engine, opaque to the core
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct AnchorId(pub u64);

impl AnchorId {
    #[inline]
    pub fn new(id: u64) -> Self {
        AnchorId(id)
    }
}

impl fmt::Debug for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Anchor({})", self.0)
    }
}
