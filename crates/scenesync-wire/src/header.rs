//! Fixed envelope header
//!
//! Fixed header is 12 bytes:
//! - Bytes 0-3: Magic `SSNC`
//! - Byte 4: Wire version
//! - Byte 5: Payload kind
//! - Bytes 6-7: Reserved (zero)
//! - Bytes 8-11: Body length (LE)

use scenesync_core::{PayloadKind, SceneError, SceneResult};

/// Fixed header size in bytes
pub const HEADER_SIZE: usize = 12;

/// Envelope magic
pub const MAGIC: [u8; 4] = *b"SSNC";

/// Current wire version
pub const WIRE_VERSION: u8 = 1;

/// Fixed header structure
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnvelopeHeader {
    pub version: u8,
    pub kind: PayloadKind,
    pub body_len: u32,
}

impl EnvelopeHeader {
    pub fn new(kind: PayloadKind, body_len: u32) -> Self {
        EnvelopeHeader {
            version: WIRE_VERSION,
            kind,
            body_len,
        }
    }

    /// Parse header from bytes
    pub fn parse(buf: &[u8]) -> SceneResult<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(SceneError::BufferTooShort {
                expected: HEADER_SIZE,
                actual: buf.len(),
            });
        }

        // Bytes 0-3: Magic
        if buf[0..4] != MAGIC {
            return Err(SceneError::InvalidMagic);
        }

        // Byte 4: Version
        let version = buf[4];
        if version != WIRE_VERSION {
            return Err(SceneError::UnsupportedVersion(version));
        }

        // Byte 5: Kind
        let kind = PayloadKind::from_byte(buf[5]).ok_or(SceneError::UnknownPayloadKind(buf[5]))?;

        // Bytes 6-7: Reserved
        if buf[6] != 0 || buf[7] != 0 {
            return Err(SceneError::InvalidPayload("reserved header bytes set".into()));
        }

        // Bytes 8-11: Body length
        let body_len = u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);

        Ok(EnvelopeHeader {
            version,
            kind,
            body_len,
        })
    }

    /// Header bytes as written at the front of an envelope
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&MAGIC);
        buf[4] = self.version;
        buf[5] = self.kind.to_byte();
        buf[8..12].copy_from_slice(&self.body_len.to_le_bytes());
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let header = EnvelopeHeader::new(PayloadKind::Marker, 0x0102_0304);
        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..4], b"SSNC");
        assert_eq!(EnvelopeHeader::parse(&bytes).unwrap(), header);
        assert_eq!(&bytes[6..8], &[0, 0]);
    }

    #[test]
    fn test_header_too_short() {
        let result = EnvelopeHeader::parse(&[0u8; 5]);
        assert!(matches!(result, Err(SceneError::BufferTooShort { expected: 12, actual: 5 })));
    }

    #[test]
    fn test_header_rejects_foreign_bytes() {
        let mut bytes = EnvelopeHeader::new(PayloadKind::Snapshot, 0).to_bytes();
        bytes[0] = b'X';
        assert!(matches!(EnvelopeHeader::parse(&bytes), Err(SceneError::InvalidMagic)));

        let mut bytes = EnvelopeHeader::new(PayloadKind::Snapshot, 0).to_bytes();
        bytes[4] = 9;
        assert!(matches!(EnvelopeHeader::parse(&bytes), Err(SceneError::UnsupportedVersion(9))));

        let mut bytes = EnvelopeHeader::new(PayloadKind::Snapshot, 0).to_bytes();
        bytes[5] = 0x7E;
        assert!(matches!(EnvelopeHeader::parse(&bytes), Err(SceneError::UnknownPayloadKind(0x7E))));
    }
}
