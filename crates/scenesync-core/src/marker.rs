//! Marker records - the drawings users place in the shared map
//!
//! A record is immutable once built. Fields are private so that every
//! record in the system has passed validation, whether it was created
//! locally or decoded from a peer.

use crate::{Color, MarkerId, Pose, SceneError, SceneResult};

/// Label carried by markers created on this device
pub const DEFAULT_MARKER_LABEL: &str = "node";

/// Maximum label length in bytes
pub const MAX_LABEL_LEN: usize = 64;

/// One placed marker: identity, pose, color, size
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerRecord {
    id: MarkerId,
    label: String,
    pose: Pose,
    color: Color,
    size: f32,
}

impl MarkerRecord {
    /// Create a marker with a fresh identity and the default label
    pub fn new(pose: Pose, color: Color, size: f32) -> SceneResult<Self> {
        Self::from_parts(
            MarkerId::random(),
            DEFAULT_MARKER_LABEL.to_string(),
            pose,
            color,
            size,
        )
    }

    /// Assemble a record from already-known parts (decoder, tests)
    pub fn from_parts(
        id: MarkerId,
        label: String,
        pose: Pose,
        color: Color,
        size: f32,
    ) -> SceneResult<Self> {
        if label.len() > MAX_LABEL_LEN {
            return Err(SceneError::InvalidPayload(format!(
                "marker label too long: {} > {}",
                label.len(),
                MAX_LABEL_LEN
            )));
        }
        if !pose.is_valid() {
            return Err(SceneError::InvalidPayload("marker pose is not a rigid transform".into()));
        }
        if !color.is_valid() {
            return Err(SceneError::InvalidPayload(format!("marker color out of range: {:?}", color)));
        }
        if !(size.is_finite() && size > 0.0) {
            return Err(SceneError::InvalidPayload(format!("marker size must be positive, got {}", size)));
        }

        Ok(MarkerRecord {
            id,
            label,
            pose,
            color,
            size,
        })
    }

    /// Same record under a different label
    pub fn with_label(self, label: impl Into<String>) -> SceneResult<Self> {
        Self::from_parts(self.id, label.into(), self.pose, self.color, self.size)
    }

    #[inline]
    pub fn id(&self) -> MarkerId {
        self.id
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    #[inline]
    pub fn color(&self) -> Color {
        self.color
    }

    #[inline]
    pub fn size(&self) -> f32 {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_marker_is_valid() {
        let m = MarkerRecord::new(Pose::from_translation(0.1, 0.2, -0.2), Color::RED, 0.05).unwrap();
        assert_eq!(m.label(), DEFAULT_MARKER_LABEL);
        assert_eq!(m.color(), Color::RED);
        assert_eq!(m.size(), 0.05);
        assert_ne!(m.id(), MarkerId::ZERO);
    }

    #[test]
    fn test_rejects_bad_size() {
        for size in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let result = MarkerRecord::new(Pose::IDENTITY, Color::WHITE, size);
            assert!(matches!(result, Err(SceneError::InvalidPayload(_))), "size {}", size);
        }
    }

    #[test]
    fn test_rejects_long_label() {
        let m = MarkerRecord::new(Pose::IDENTITY, Color::WHITE, 0.1).unwrap();
        assert!(m.with_label("x".repeat(MAX_LABEL_LEN + 1)).is_err());
    }
}
