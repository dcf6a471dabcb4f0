//! Codec - typed encode/decode over envelopes
//!
//! `decode::<T>` fails with `TypeMismatch` when handed another kind's bytes.
//! `decode_any` is the receive-side dispatch: kinds are tried in
//! `PayloadKind::TRIAL_ORDER` (snapshot, then marker) and the first
//! successful decode wins.

use bytes::BytesMut;

use scenesync_core::{MapSnapshot, MarkerRecord, PayloadKind, SceneError, SceneResult};

use crate::{seal, Envelope, WirePayload, DEFAULT_MAX_BODY_SIZE};

/// Any payload that can arrive on the peer channel
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Snapshot(MapSnapshot),
    Marker(MarkerRecord),
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Snapshot(_) => PayloadKind::Snapshot,
            Payload::Marker(_) => PayloadKind::Marker,
        }
    }
}

/// Envelope codec with a body size limit
#[derive(Clone, Copy, Debug)]
pub struct Codec {
    max_body_size: usize,
}

impl Codec {
    pub fn new(max_body_size: usize) -> Self {
        Codec { max_body_size }
    }

    #[inline]
    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    /// Encode a value into a sealed envelope
    pub fn encode<T: WirePayload>(&self, value: &T) -> SceneResult<Vec<u8>> {
        let mut body = BytesMut::new();
        value.encode_body(&mut body)?;
        seal(T::KIND, &body, self.max_body_size)
    }

    /// Decode an envelope that must hold a `T`
    pub fn decode<T: WirePayload>(&self, bytes: &[u8]) -> SceneResult<T> {
        let envelope = Envelope::open(bytes, self.max_body_size)?;
        if envelope.kind() != T::KIND {
            return Err(SceneError::TypeMismatch {
                expected: T::KIND,
                actual: envelope.kind(),
            });
        }
        T::decode_body(envelope.body)
    }

    /// Trial-decode dispatch for untyped channel bytes
    pub fn decode_any(&self, bytes: &[u8]) -> SceneResult<Payload> {
        let mut last_err = None;

        for kind in PayloadKind::TRIAL_ORDER {
            let attempt = match kind {
                PayloadKind::Snapshot => self.decode::<MapSnapshot>(bytes).map(Payload::Snapshot),
                PayloadKind::Marker => self.decode::<MarkerRecord>(bytes).map(Payload::Marker),
            };

            match attempt {
                Ok(payload) => return Ok(payload),
                // Wrong guess, try the next kind
                Err(err @ SceneError::TypeMismatch { .. }) => last_err = Some(err),
                // Anything else is wrong with the bytes themselves
                Err(err) => return Err(err),
            }
        }

        Err(last_err.unwrap_or_else(|| SceneError::InvalidPayload("no payload kind matched".into())))
    }
}

impl Default for Codec {
    fn default() -> Self {
        Codec::new(DEFAULT_MAX_BODY_SIZE)
    }
}

/// Encode with the default codec
pub fn encode<T: WirePayload>(value: &T) -> SceneResult<Vec<u8>> {
    Codec::default().encode(value)
}

/// Decode with the default codec
pub fn decode<T: WirePayload>(bytes: &[u8]) -> SceneResult<T> {
    Codec::default().decode(bytes)
}

/// Trial-decode with the default codec
pub fn decode_any(bytes: &[u8]) -> SceneResult<Payload> {
    Codec::default().decode_any(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use scenesync_core::{Color, MarkerId, Pose, Provenance};

    fn red_marker() -> MarkerRecord {
        MarkerRecord::new(Pose::from_translation(0.1, -0.2, -0.5), Color::RED, 0.05).unwrap()
    }

    #[test]
    fn test_marker_roundtrip() {
        let m = red_marker();
        let bytes = encode(&m).unwrap();
        assert_eq!(decode::<MarkerRecord>(&bytes).unwrap(), m);
    }

    #[test]
    fn test_marker_as_snapshot_is_type_mismatch() {
        let bytes = encode(&red_marker()).unwrap();
        let result = decode::<MapSnapshot>(&bytes);
        assert!(matches!(
            result,
            Err(SceneError::TypeMismatch {
                expected: PayloadKind::Snapshot,
                actual: PayloadKind::Marker
            })
        ));
    }

    #[test]
    fn test_snapshot_as_marker_is_type_mismatch() {
        let bytes = encode(&MapSnapshot::new(1, vec![1u8, 2, 3])).unwrap();
        assert!(matches!(
            decode::<MarkerRecord>(&bytes),
            Err(SceneError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_any_dispatch() {
        let m = red_marker();
        let s = MapSnapshot::new(4, vec![0xABu8; 128]).with_provenance(Provenance::Loaded);

        assert_eq!(decode_any(&encode(&m).unwrap()).unwrap(), Payload::Marker(m));
        assert_eq!(decode_any(&encode(&s).unwrap()).unwrap(), Payload::Snapshot(s));
    }

    #[test]
    fn test_decode_any_garbage() {
        for garbage in [&b""[..], &b"hello"[..], &[0u8; 200][..]] {
            let err = decode_any(garbage).unwrap_err();
            assert!(err.is_decode_error(), "{:?}", err);
        }
    }

    #[test]
    fn test_codec_limit_applies_to_encode() {
        let codec = Codec::new(8);
        let result = codec.encode(&MapSnapshot::new(1, vec![0u8; 100]));
        assert!(matches!(result, Err(SceneError::PayloadTooLarge { .. })));
    }

    fn arb_marker() -> impl Strategy<Value = MarkerRecord> {
        (
            any::<u64>(),
            "[a-z]{0,16}",
            prop::array::uniform3(-50.0f32..50.0),
            prop::array::uniform4(0.0f32..=1.0),
            0.001f32..2.0,
        )
            .prop_map(|(id, label, [x, y, z], rgba, size)| {
                MarkerRecord::from_parts(
                    MarkerId::new(id),
                    label,
                    Pose::from_translation(x, y, z),
                    Color::from_array(rgba),
                    size,
                )
                .unwrap()
            })
    }

    fn arb_snapshot() -> impl Strategy<Value = MapSnapshot> {
        (any::<u32>(), 0u8..3, prop::collection::vec(any::<u8>(), 0..2048)).prop_map(
            |(version, p, data)| {
                MapSnapshot::new(version, data)
                    .with_provenance(Provenance::from_byte(p).unwrap_or_default())
            },
        )
    }

    proptest! {
        #[test]
        fn prop_marker_roundtrip_and_type_safety(m in arb_marker()) {
            let bytes = encode(&m).unwrap();
            prop_assert_eq!(decode::<MarkerRecord>(&bytes).unwrap(), m.clone());
            let is_mismatch = matches!(
                decode::<MapSnapshot>(&bytes),
                Err(SceneError::TypeMismatch { .. })
            );
            prop_assert!(is_mismatch);
        }

        #[test]
        fn prop_snapshot_roundtrip(s in arb_snapshot()) {
            let bytes = encode(&s).unwrap();
            prop_assert_eq!(decode::<MapSnapshot>(&bytes).unwrap(), s);
        }

        #[test]
        fn prop_decode_any_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
            let _ = decode_any(&bytes);
        }
    }
}
