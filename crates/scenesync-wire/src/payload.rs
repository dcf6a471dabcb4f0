//! Body encodings for the two payload kinds
//!
//! Marker body:
//! - id: u64
//! - label: u8 length + UTF-8 bytes
//! - pose: 16 × f32, column-major
//! - color: 4 × f32, RGBA
//! - size: f32
//!
//! Snapshot body:
//! - format_version: u32
//! - provenance: u8
//! - data: u32 length + bytes
//!
//! All integers and floats little-endian.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use scenesync_core::{
    Color, MapSnapshot, MarkerId, MarkerRecord, PayloadKind, Pose, Provenance, SceneError,
    SceneResult, MAX_LABEL_LEN,
};

/// A value that can travel inside an envelope
pub trait WirePayload: Sized {
    /// Type tag written into the envelope header
    const KIND: PayloadKind;

    fn encode_body(&self, buf: &mut BytesMut) -> SceneResult<()>;

    /// Decode a body; must consume it exactly
    fn decode_body(body: &[u8]) -> SceneResult<Self>;
}

fn ensure(buf: &impl Buf, needed: usize) -> SceneResult<()> {
    if buf.remaining() < needed {
        return Err(SceneError::BufferTooShort {
            expected: needed,
            actual: buf.remaining(),
        });
    }
    Ok(())
}

fn ensure_consumed(buf: &impl Buf, kind: PayloadKind) -> SceneResult<()> {
    if buf.has_remaining() {
        return Err(SceneError::InvalidPayload(format!(
            "{} trailing bytes in {} body",
            buf.remaining(),
            kind
        )));
    }
    Ok(())
}

/// Fixed part of a marker body after the label
const MARKER_FIXED_TAIL: usize = (16 + 4 + 1) * 4;

impl WirePayload for MarkerRecord {
    const KIND: PayloadKind = PayloadKind::Marker;

    fn encode_body(&self, buf: &mut BytesMut) -> SceneResult<()> {
        let label = self.label().as_bytes();
        if label.len() > MAX_LABEL_LEN {
            return Err(SceneError::InvalidPayload("marker label too long".into()));
        }

        buf.reserve(8 + 1 + label.len() + MARKER_FIXED_TAIL);
        buf.put_u64_le(self.id().0);
        buf.put_u8(label.len() as u8);
        buf.put_slice(label);
        for v in self.pose().to_array() {
            buf.put_f32_le(v);
        }
        for c in self.color().to_array() {
            buf.put_f32_le(c);
        }
        buf.put_f32_le(self.size());
        Ok(())
    }

    fn decode_body(body: &[u8]) -> SceneResult<Self> {
        let mut buf = body;

        ensure(&buf, 9)?;
        let id = MarkerId::new(buf.get_u64_le());
        let label_len = buf.get_u8() as usize;

        ensure(&buf, label_len)?;
        let label = std::str::from_utf8(&buf[..label_len])
            .map_err(|_| SceneError::InvalidPayload("marker label is not UTF-8".into()))?
            .to_string();
        buf.advance(label_len);

        ensure(&buf, MARKER_FIXED_TAIL)?;
        let mut pose = [0.0f32; 16];
        for v in pose.iter_mut() {
            *v = buf.get_f32_le();
        }
        let mut color = [0.0f32; 4];
        for c in color.iter_mut() {
            *c = buf.get_f32_le();
        }
        let size = buf.get_f32_le();
        ensure_consumed(&buf, Self::KIND)?;

        MarkerRecord::from_parts(id, label, Pose::from_array(pose), Color::from_array(color), size)
    }
}

impl WirePayload for MapSnapshot {
    const KIND: PayloadKind = PayloadKind::Snapshot;

    fn encode_body(&self, buf: &mut BytesMut) -> SceneResult<()> {
        let len = u32::try_from(self.data.len()).map_err(|_| SceneError::PayloadTooLarge {
            size: self.data.len(),
            max: u32::MAX as usize,
        })?;

        buf.reserve(9 + self.data.len());
        buf.put_u32_le(self.format_version);
        buf.put_u8(self.provenance.to_byte());
        buf.put_u32_le(len);
        buf.put_slice(&self.data);
        Ok(())
    }

    fn decode_body(body: &[u8]) -> SceneResult<Self> {
        let mut buf = body;

        ensure(&buf, 9)?;
        let format_version = buf.get_u32_le();
        let provenance_byte = buf.get_u8();
        let provenance = Provenance::from_byte(provenance_byte).ok_or_else(|| {
            SceneError::InvalidPayload(format!("unknown provenance {:#04x}", provenance_byte))
        })?;
        let len = buf.get_u32_le() as usize;

        ensure(&buf, len)?;
        let data = Bytes::copy_from_slice(&buf[..len]);
        buf.advance(len);
        ensure_consumed(&buf, Self::KIND)?;

        Ok(MapSnapshot {
            format_version,
            provenance,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_body_layout() {
        let m = MarkerRecord::from_parts(
            MarkerId::new(7),
            "node".into(),
            Pose::from_translation(1.0, 2.0, 3.0),
            Color::RED,
            0.05,
        )
        .unwrap();

        let mut buf = BytesMut::new();
        m.encode_body(&mut buf).unwrap();
        assert_eq!(buf.len(), 8 + 1 + 4 + MARKER_FIXED_TAIL);
        assert_eq!(&buf[0..8], &7u64.to_le_bytes());
        assert_eq!(buf[8], 4);
        assert_eq!(&buf[9..13], b"node");

        assert_eq!(MarkerRecord::decode_body(&buf).unwrap(), m);
    }

    #[test]
    fn test_marker_body_truncated() {
        let m = MarkerRecord::new(Pose::IDENTITY, Color::BLUE, 0.1).unwrap();
        let mut buf = BytesMut::new();
        m.encode_body(&mut buf).unwrap();

        let result = MarkerRecord::decode_body(&buf[..buf.len() - 2]);
        assert!(matches!(result, Err(SceneError::BufferTooShort { .. })));
    }

    #[test]
    fn test_marker_body_invalid_values() {
        let m = MarkerRecord::new(Pose::IDENTITY, Color::BLUE, 0.1).unwrap();
        let mut buf = BytesMut::new();
        m.encode_body(&mut buf).unwrap();

        // Overwrite size with a negative value
        let len = buf.len();
        buf[len - 4..].copy_from_slice(&(-1.0f32).to_le_bytes());
        assert!(matches!(
            MarkerRecord::decode_body(&buf),
            Err(SceneError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_snapshot_body_trailing_bytes() {
        let s = MapSnapshot::new(2, vec![9u8; 10]);
        let mut buf = BytesMut::new();
        s.encode_body(&mut buf).unwrap();
        buf.put_u8(0);

        assert!(matches!(
            MapSnapshot::decode_body(&buf),
            Err(SceneError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_snapshot_body_unknown_provenance() {
        let s = MapSnapshot::new(2, Vec::<u8>::new());
        let mut buf = BytesMut::new();
        s.encode_body(&mut buf).unwrap();
        buf[4] = 0x44;

        assert!(MapSnapshot::decode_body(&buf).is_err());
    }
}
