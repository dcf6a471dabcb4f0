//! Reconciliation policy
//!
//! Markers grow append-only. Snapshots replace: adopting one clears every
//! marker anchored to the old session and starts a new epoch. There is no
//! merge of concurrent edits; the last snapshot adopted wins.

use scenesync_core::{MapSnapshot, MarkerRecord, PeerId, Provenance, SessionEpoch};

use crate::{MarkerField, RenderedMarker};

/// Outcome of folding one marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldOutcome {
    /// Appended at this index
    Inserted(usize),
    /// Same identity already shown and deduplication is on
    Duplicate,
}

/// Outcome of adopting a snapshot or resetting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdoptOutcome {
    /// Markers dropped with the previous session
    pub orphaned: usize,
    /// Epoch of the session that now owns the field
    pub epoch: SessionEpoch,
}

/// State reconciliation engine
#[derive(Debug)]
pub struct ReconciliationEngine {
    field: MarkerField,
    current: Option<MapSnapshot>,
    epoch: SessionEpoch,
    dedupe_markers: bool,
}

impl ReconciliationEngine {
    pub fn new() -> Self {
        ReconciliationEngine {
            field: MarkerField::new(),
            current: None,
            epoch: SessionEpoch::default(),
            dedupe_markers: false,
        }
    }

    /// Drop markers whose identity is already shown
    pub fn with_dedupe(mut self, dedupe_markers: bool) -> Self {
        self.dedupe_markers = dedupe_markers;
        self
    }

    pub fn field(&self) -> &MarkerField {
        &self.field
    }

    pub fn field_mut(&mut self) -> &mut MarkerField {
        &mut self.field
    }

    /// The authoritative snapshot, if the session was seeded
    pub fn current_snapshot(&self) -> Option<&MapSnapshot> {
        self.current.as_ref()
    }

    pub fn epoch(&self) -> SessionEpoch {
        self.epoch
    }

    pub fn dedupe_markers(&self) -> bool {
        self.dedupe_markers
    }

    /// Add a marker to the render set
    pub fn fold_marker(&mut self, record: MarkerRecord, origin: PeerId) -> FoldOutcome {
        if self.dedupe_markers && self.field.contains(record.id()) {
            tracing::debug!(marker = %record.id(), %origin, "duplicate marker ignored");
            return FoldOutcome::Duplicate;
        }

        let index = self.field.push(RenderedMarker::new(record, origin));
        FoldOutcome::Inserted(index)
    }

    /// Replace the session with one seeded from `snapshot`
    pub fn adopt_snapshot(&mut self, snapshot: MapSnapshot, provenance: Provenance) -> AdoptOutcome {
        let orphaned = self.field.clear();
        self.epoch = self.epoch.next();

        tracing::debug!(
            epoch = self.epoch.0,
            orphaned,
            %provenance,
            len = snapshot.len(),
            "snapshot adopted"
        );

        self.current = Some(snapshot.with_provenance(provenance));
        AdoptOutcome {
            orphaned,
            epoch: self.epoch,
        }
    }

    /// Start a fresh, unseeded session
    pub fn reset(&mut self) -> AdoptOutcome {
        let orphaned = self.field.clear();
        self.current = None;
        self.epoch = self.epoch.next();

        tracing::debug!(epoch = self.epoch.0, orphaned, "session reset");

        AdoptOutcome {
            orphaned,
            epoch: self.epoch,
        }
    }

    /// Start a new epoch without touching markers or the snapshot
    ///
    /// Used when the engine is suspended: anything still in flight for the
    /// old epoch becomes stale.
    pub fn advance_epoch(&mut self) -> SessionEpoch {
        self.epoch = self.epoch.next();
        self.epoch
    }
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use scenesync_core::{Color, Pose};

    fn marker() -> MarkerRecord {
        MarkerRecord::new(Pose::from_translation(0.0, 0.0, -0.2), Color::RED, 0.05).unwrap()
    }

    #[test]
    fn test_fold_without_dedupe_keeps_duplicates() {
        let mut engine = ReconciliationEngine::new();
        let m = marker();

        assert_eq!(engine.fold_marker(m.clone(), PeerId::new(2)), FoldOutcome::Inserted(0));
        assert_eq!(engine.fold_marker(m, PeerId::new(2)), FoldOutcome::Inserted(1));
        assert_eq!(engine.field().len(), 2);
    }

    #[test]
    fn test_fold_with_dedupe() {
        let mut engine = ReconciliationEngine::new().with_dedupe(true);
        let m = marker();

        assert_eq!(engine.fold_marker(m.clone(), PeerId::new(2)), FoldOutcome::Inserted(0));
        assert_eq!(engine.fold_marker(m, PeerId::new(3)), FoldOutcome::Duplicate);
        assert_eq!(engine.field().len(), 1);
    }

    #[test]
    fn test_adopt_replaces_session() {
        let mut engine = ReconciliationEngine::new();
        engine.fold_marker(marker(), PeerId::LOCAL);
        engine.fold_marker(marker(), PeerId::LOCAL);
        let before = engine.epoch();

        let outcome = engine.adopt_snapshot(MapSnapshot::new(1, vec![1u8, 2]), Provenance::Received);

        assert_eq!(outcome.orphaned, 2);
        assert!(outcome.epoch > before);
        assert!(engine.field().is_empty());
        assert_eq!(engine.current_snapshot().unwrap().provenance, Provenance::Received);

        // Markers after adoption stay
        engine.fold_marker(marker(), PeerId::new(5));
        assert_eq!(engine.field().len(), 1);
    }

    #[test]
    fn test_adopt_same_snapshot_twice_is_idempotent() {
        let mut engine = ReconciliationEngine::new();
        let snapshot = MapSnapshot::new(1, vec![4u8; 32]);

        engine.adopt_snapshot(snapshot.clone(), Provenance::Loaded);
        let first = engine.current_snapshot().cloned();
        engine.adopt_snapshot(snapshot, Provenance::Loaded);

        assert_eq!(engine.current_snapshot().cloned(), first);
        assert!(engine.field().is_empty());
    }

    #[test]
    fn test_reset_drops_seed() {
        let mut engine = ReconciliationEngine::new();
        engine.adopt_snapshot(MapSnapshot::new(1, vec![0u8]), Provenance::Loaded);
        engine.fold_marker(marker(), PeerId::LOCAL);

        let outcome = engine.reset();
        assert_eq!(outcome.orphaned, 1);
        assert!(engine.current_snapshot().is_none());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Fold,
        Adopt,
        Reset,
    }

    proptest! {
        #[test]
        fn prop_field_holds_markers_since_last_replace(
            ops in prop::collection::vec(prop_oneof![Just(Op::Fold), Just(Op::Adopt), Just(Op::Reset)], 0..64)
        ) {
            let mut engine = ReconciliationEngine::new();
            let mut expected = 0usize;
            let mut last_epoch = engine.epoch();

            for op in ops {
                match op {
                    Op::Fold => {
                        engine.fold_marker(marker(), PeerId::LOCAL);
                        expected += 1;
                    }
                    Op::Adopt => {
                        let outcome = engine.adopt_snapshot(MapSnapshot::new(1, Vec::<u8>::new()), Provenance::Received);
                        prop_assert_eq!(outcome.orphaned, expected);
                        prop_assert!(outcome.epoch > last_epoch);
                        last_epoch = outcome.epoch;
                        expected = 0;
                    }
                    Op::Reset => {
                        let outcome = engine.reset();
                        prop_assert_eq!(outcome.orphaned, expected);
                        last_epoch = outcome.epoch;
                        expected = 0;
                    }
                }
                prop_assert_eq!(engine.field().len(), expected);
            }
        }
    }
}
