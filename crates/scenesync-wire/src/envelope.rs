//! Envelope = Fixed Header + Body + Digest
//!
//! The digest covers the header, so a flipped kind byte is caught as an
//! integrity failure instead of being decoded as the other payload kind.

use sha2::{Digest, Sha256};

use scenesync_core::{PayloadKind, SceneError, SceneResult};

use crate::{EnvelopeHeader, HEADER_SIZE};

/// SHA-256 digest size
pub const DIGEST_SIZE: usize = 32;

/// Minimum envelope size (header + digest, empty body)
pub const MIN_ENVELOPE_SIZE: usize = HEADER_SIZE + DIGEST_SIZE;

/// Default body limit; map snapshots of a large room run to a few MiB
pub const DEFAULT_MAX_BODY_SIZE: usize = 64 * 1024 * 1024;

fn digest(header: &[u8], body: &[u8]) -> [u8; DIGEST_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update(header);
    hasher.update(body);
    hasher.finalize().into()
}

/// Borrowed view of a verified envelope (zero-copy)
#[derive(Debug)]
pub struct Envelope<'a> {
    pub header: EnvelopeHeader,
    pub body: &'a [u8],
}

impl<'a> Envelope<'a> {
    /// Parse and verify an envelope
    pub fn open(buf: &'a [u8], max_body_size: usize) -> SceneResult<Self> {
        if buf.len() < MIN_ENVELOPE_SIZE {
            return Err(SceneError::BufferTooShort {
                expected: MIN_ENVELOPE_SIZE,
                actual: buf.len(),
            });
        }

        let header = EnvelopeHeader::parse(buf)?;
        let body_len = header.body_len as usize;

        if body_len > max_body_size {
            return Err(SceneError::PayloadTooLarge {
                size: body_len,
                max: max_body_size,
            });
        }

        let expected = HEADER_SIZE + body_len + DIGEST_SIZE;
        if buf.len() < expected {
            return Err(SceneError::BufferTooShort {
                expected,
                actual: buf.len(),
            });
        }
        if buf.len() > expected {
            return Err(SceneError::InvalidPayload(format!(
                "{} trailing bytes after envelope",
                buf.len() - expected
            )));
        }

        let body_end = HEADER_SIZE + body_len;
        let body = &buf[HEADER_SIZE..body_end];
        if digest(&buf[..HEADER_SIZE], body)[..] != buf[body_end..] {
            return Err(SceneError::IntegrityCheckFailed);
        }

        Ok(Envelope { header, body })
    }

    #[inline]
    pub fn kind(&self) -> PayloadKind {
        self.header.kind
    }
}

/// Wrap an encoded body in a header and digest
pub fn seal(kind: PayloadKind, body: &[u8], max_body_size: usize) -> SceneResult<Vec<u8>> {
    if body.len() > max_body_size || body.len() > u32::MAX as usize {
        return Err(SceneError::PayloadTooLarge {
            size: body.len(),
            max: max_body_size.min(u32::MAX as usize),
        });
    }

    let header = EnvelopeHeader::new(kind, body.len() as u32).to_bytes();

    let mut buf = Vec::with_capacity(HEADER_SIZE + body.len() + DIGEST_SIZE);
    buf.extend_from_slice(&header);
    buf.extend_from_slice(body);
    buf.extend_from_slice(&digest(&header, body));
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open() {
        let bytes = seal(PayloadKind::Marker, b"body", DEFAULT_MAX_BODY_SIZE).unwrap();
        assert_eq!(bytes.len(), MIN_ENVELOPE_SIZE + 4);

        let env = Envelope::open(&bytes, DEFAULT_MAX_BODY_SIZE).unwrap();
        assert_eq!(env.kind(), PayloadKind::Marker);
        assert_eq!(env.body, b"body");
    }

    #[test]
    fn test_flipped_kind_is_integrity_failure() {
        let mut bytes = seal(PayloadKind::Marker, b"body", DEFAULT_MAX_BODY_SIZE).unwrap();
        bytes[5] = PayloadKind::Snapshot.to_byte();
        assert!(matches!(
            Envelope::open(&bytes, DEFAULT_MAX_BODY_SIZE),
            Err(SceneError::IntegrityCheckFailed)
        ));
    }

    #[test]
    fn test_flipped_body_bit() {
        let mut bytes = seal(PayloadKind::Snapshot, &[7u8; 64], DEFAULT_MAX_BODY_SIZE).unwrap();
        bytes[HEADER_SIZE + 10] ^= 0x01;
        assert!(matches!(
            Envelope::open(&bytes, DEFAULT_MAX_BODY_SIZE),
            Err(SceneError::IntegrityCheckFailed)
        ));
    }

    #[test]
    fn test_truncated_and_padded() {
        let bytes = seal(PayloadKind::Snapshot, &[1u8; 16], DEFAULT_MAX_BODY_SIZE).unwrap();

        let truncated = &bytes[..bytes.len() - 1];
        assert!(matches!(
            Envelope::open(truncated, DEFAULT_MAX_BODY_SIZE),
            Err(SceneError::BufferTooShort { .. })
        ));

        let mut padded = bytes.clone();
        padded.push(0);
        assert!(matches!(
            Envelope::open(&padded, DEFAULT_MAX_BODY_SIZE),
            Err(SceneError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_body_limit() {
        assert!(matches!(
            seal(PayloadKind::Snapshot, &[0u8; 32], 16),
            Err(SceneError::PayloadTooLarge { size: 32, max: 16 })
        ));

        let bytes = seal(PayloadKind::Snapshot, &[0u8; 32], 64).unwrap();
        assert!(matches!(
            Envelope::open(&bytes, 16),
            Err(SceneError::PayloadTooLarge { size: 32, max: 16 })
        ));
    }
}
