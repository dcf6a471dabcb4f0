//! Spatial map snapshots
//!
//! A snapshot is the tracking engine's serialized understanding of the
//! room. The core treats the data as opaque: it is carried, persisted and
//! handed back to the engine, never interpreted.

use std::fmt;

use bytes::Bytes;

/// Where a snapshot came from. Observability only, never changes handling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Provenance {
    /// Captured from the local tracking engine
    #[default]
    Captured = 0x00,
    /// Received whole from a connected peer
    Received = 0x01,
    /// Loaded from the on-device store
    Loaded = 0x02,
}

impl Provenance {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(Provenance::Captured),
            0x01 => Some(Provenance::Received),
            0x02 => Some(Provenance::Loaded),
            _ => None,
        }
    }

    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Provenance::Captured => "captured",
            Provenance::Received => "received",
            Provenance::Loaded => "loaded",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Opaque, versioned map blob
#[derive(Clone, PartialEq, Eq)]
pub struct MapSnapshot {
    /// Engine-defined format version of `data`
    pub format_version: u32,
    pub provenance: Provenance,
    pub data: Bytes,
}

impl MapSnapshot {
    pub fn new(format_version: u32, data: impl Into<Bytes>) -> Self {
        MapSnapshot {
            format_version,
            provenance: Provenance::Captured,
            data: data.into(),
        }
    }

    /// Re-stamp the provenance, keeping the payload
    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for MapSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapSnapshot")
            .field("format_version", &self.format_version)
            .field("provenance", &self.provenance)
            .field("len", &self.data.len())
            .finish()
    }
}
