//! Marker field - the render set and its anchor side table

use std::collections::HashMap;

use scenesync_core::{AnchorId, MarkerId, MarkerRecord, PeerId, Pose};

/// A marker as currently shown on this device
#[derive(Debug, Clone)]
pub struct RenderedMarker {
    /// The immutable record, as created or received
    pub record: MarkerRecord,
    /// Who created it (`PeerId::LOCAL` for this device)
    pub origin: PeerId,
    /// Anchor registered with the tracking engine, if any
    pub anchor: Option<AnchorId>,
    /// Latest pose reported by the engine for the anchor
    pub display_pose: Pose,
}

impl RenderedMarker {
    pub fn new(record: MarkerRecord, origin: PeerId) -> Self {
        let display_pose = *record.pose();
        RenderedMarker {
            record,
            origin,
            anchor: None,
            display_pose,
        }
    }
}

/// Marker field - append-only until cleared
#[derive(Debug, Default)]
pub struct MarkerField {
    markers: Vec<RenderedMarker>,
    /// First index per marker identity
    by_id: HashMap<MarkerId, usize>,
    /// Engine anchor -> index
    anchors: HashMap<AnchorId, usize>,
}

impl MarkerField {
    pub fn new() -> Self {
        MarkerField::default()
    }

    /// Append a marker, returning its index
    pub fn push(&mut self, marker: RenderedMarker) -> usize {
        let index = self.markers.len();
        self.by_id.entry(marker.record.id()).or_insert(index);
        if let Some(anchor) = marker.anchor {
            self.anchors.insert(anchor, index);
        }
        self.markers.push(marker);
        index
    }

    /// Record the engine anchor backing the marker at `index`
    pub fn attach_anchor(&mut self, index: usize, anchor: AnchorId) -> bool {
        let Some(marker) = self.markers.get_mut(index) else {
            return false;
        };
        if let Some(previous) = marker.anchor.replace(anchor) {
            self.anchors.remove(&previous);
        }
        self.anchors.insert(anchor, index);
        true
    }

    pub fn contains(&self, id: MarkerId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn get(&self, index: usize) -> Option<&RenderedMarker> {
        self.markers.get(index)
    }

    /// First marker with this identity
    pub fn get_by_id(&self, id: MarkerId) -> Option<&RenderedMarker> {
        self.by_id.get(&id).and_then(|&i| self.markers.get(i))
    }

    /// Look up a marker through the side table
    pub fn get_by_anchor(&self, anchor: AnchorId) -> Option<&RenderedMarker> {
        self.anchors.get(&anchor).and_then(|&i| self.markers.get(i))
    }

    /// Update the display pose of an anchored marker; the record is untouched
    pub fn update_anchor_pose(&mut self, anchor: AnchorId, pose: Pose) -> Option<MarkerId> {
        let index = *self.anchors.get(&anchor)?;
        let marker = self.markers.get_mut(index)?;
        marker.display_pose = pose;
        Some(marker.record.id())
    }

    /// Number of entries carrying this identity
    pub fn count_of(&self, id: MarkerId) -> usize {
        self.markers.iter().filter(|m| m.record.id() == id).count()
    }

    /// Drop everything, returning how many markers were removed
    pub fn clear(&mut self) -> usize {
        let removed = self.markers.len();
        self.markers.clear();
        self.by_id.clear();
        self.anchors.clear();
        removed
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RenderedMarker> {
        self.markers.iter()
    }

    /// Anchors currently backed by a marker
    pub fn anchors(&self) -> impl Iterator<Item = AnchorId> + '_ {
        self.anchors.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenesync_core::Color;

    fn marker(x: f32) -> MarkerRecord {
        MarkerRecord::new(Pose::from_translation(x, 0.0, 0.0), Color::GREEN, 0.1).unwrap()
    }

    #[test]
    fn test_marker_field_basic() {
        let mut field = MarkerField::new();
        let m = marker(1.0);
        let id = m.id();

        let index = field.push(RenderedMarker::new(m, PeerId::LOCAL));

        assert_eq!(index, 0);
        assert!(field.contains(id));
        assert_eq!(field.len(), 1);
        assert_eq!(field.get_by_id(id).unwrap().origin, PeerId::LOCAL);
    }

    #[test]
    fn test_anchor_side_table() {
        let mut field = MarkerField::new();
        let m = marker(2.0);
        let id = m.id();
        let index = field.push(RenderedMarker::new(m, PeerId::new(9)));

        assert!(field.attach_anchor(index, AnchorId::new(77)));
        assert_eq!(field.get_by_anchor(AnchorId::new(77)).unwrap().record.id(), id);
        assert!(field.get_by_anchor(AnchorId::new(78)).is_none());

        let refined = Pose::from_translation(2.01, 0.0, 0.0);
        assert_eq!(field.update_anchor_pose(AnchorId::new(77), refined), Some(id));
        let shown = field.get_by_anchor(AnchorId::new(77)).unwrap();
        assert_eq!(shown.display_pose, refined);
        assert_eq!(*shown.record.pose(), Pose::from_translation(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_duplicates_are_kept_in_order() {
        let mut field = MarkerField::new();
        let m = marker(3.0);
        let id = m.id();

        field.push(RenderedMarker::new(m.clone(), PeerId::new(1)));
        field.push(RenderedMarker::new(m, PeerId::new(1)));

        assert_eq!(field.len(), 2);
        assert_eq!(field.count_of(id), 2);
    }

    #[test]
    fn test_clear() {
        let mut field = MarkerField::new();
        let index = field.push(RenderedMarker::new(marker(0.0), PeerId::LOCAL));
        field.attach_anchor(index, AnchorId::new(1));
        field.push(RenderedMarker::new(marker(1.0), PeerId::LOCAL));

        assert_eq!(field.clear(), 2);
        assert!(field.is_empty());
        assert_eq!(field.anchors().count(), 0);
    }
}
