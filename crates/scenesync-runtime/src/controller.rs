//! Reconciliation controller - the session state machine
//!
//! States: `Uninitialized`, `TrackingFresh`, `TrackingSeeded`, `Paused`.
//!
//! - `start`: uninitialized or paused -> fresh
//! - `reset`: any -> fresh, markers dropped
//! - `load_snapshot` / `receive_snapshot`: any -> seeded, markers dropped
//! - `pause`: any -> paused
//!
//! Markers only grow between resets and adoptions. A save captures the map
//! asynchronously, then persists it, then broadcasts it, in that order.

use std::collections::VecDeque;

use tokio::sync::mpsc;

use scenesync_core::{
    AnchorKind, Color, MapSnapshot, MarkerId, MarkerRecord, PayloadKind, PeerId, PeerInfo, Pose,
    Provenance, SceneError, SceneResult, ScreenPoint, SessionEpoch, TrackingState,
};
use scenesync_state::{AdoptOutcome, FoldOutcome, MarkerField, ReconciliationEngine, RenderedMarker};
use scenesync_store::{FlagStore, MemoryFlagStore, SnapshotStore};
use scenesync_transport::PeerTransport;
use scenesync_wire::{Codec, Payload};

use crate::config::ControllerConfig;
use crate::engine::{AnchorEvent, CaptureReply, CaptureTicket, TrackingEngine};
use crate::handle::{Command, ControllerHandle, Inbox, Input};
use crate::report::{ControllerStats, Notification, StatusReport};

/// Reconciliation controller
///
/// Owns the marker field and the current snapshot. Nothing else mutates
/// them; other threads go through a `ControllerHandle`.
pub struct Controller<E, T, S> {
    engine: E,
    transport: T,
    store: S,
    flags: Box<dyn FlagStore>,
    codec: Codec,
    reconciler: ReconciliationEngine,
    state: TrackingState,
    /// Save in flight, if any
    pending_capture: Option<CaptureTicket>,
    next_request: u64,
    inbox: Inbox,
    /// Weak so that dropping every handle ends `run`
    tx: mpsc::WeakUnboundedSender<Input>,
    notifications: VecDeque<Notification>,
    config: ControllerConfig,
    stats: ControllerStats,
    closed: bool,
}

impl<E, T, S> Controller<E, T, S>
where
    E: TrackingEngine,
    T: PeerTransport,
    S: SnapshotStore,
{
    /// Create a controller and the first handle to it
    pub fn new(engine: E, transport: T, store: S, config: ControllerConfig) -> (Self, ControllerHandle) {
        let (tx, inbox) = mpsc::unbounded_channel();

        let controller = Controller {
            engine,
            transport,
            store,
            flags: Box::new(MemoryFlagStore::new()),
            codec: Codec::new(config.max_payload_size),
            reconciler: ReconciliationEngine::new().with_dedupe(config.dedupe_markers),
            state: TrackingState::Uninitialized,
            pending_capture: None,
            next_request: 0,
            inbox,
            tx: tx.downgrade(),
            notifications: VecDeque::new(),
            config,
            stats: ControllerStats::default(),
            closed: false,
        };

        (controller, ControllerHandle::new(tx))
    }

    /// Use `flags` for session flags such as first launch
    pub fn with_flags(mut self, flags: impl FlagStore + 'static) -> Self {
        self.flags = Box::new(flags);
        self
    }

    /// Another handle, while at least one is still alive
    pub fn handle(&self) -> SceneResult<ControllerHandle> {
        self.tx
            .upgrade()
            .map(ControllerHandle::new)
            .ok_or(SceneError::ControllerClosed)
    }

    // Lifecycle

    /// Begin or resume tracking
    pub fn start(&mut self) {
        match self.state {
            TrackingState::Uninitialized | TrackingState::Paused => {
                self.engine.start();
                self.transition(TrackingState::TrackingFresh);
            }
            state => tracing::debug!(%state, "start ignored, already tracking"),
        }
    }

    /// Suspend tracking; inbound payloads are dropped until `start`
    pub fn pause(&mut self) {
        if self.state == TrackingState::Paused {
            return;
        }

        self.engine.pause();
        self.reconciler.advance_epoch();
        if let Some(ticket) = self.pending_capture.take() {
            tracing::debug!(request = ticket.request_id, "pending capture abandoned");
        }
        self.transition(TrackingState::Paused);
    }

    /// Restart tracking from scratch, dropping every marker
    pub fn reset(&mut self) -> usize {
        let outcome = self.reconciler.reset();
        self.abandon_capture("session was reset");
        self.engine.adopt_snapshot(None);
        self.transition(TrackingState::TrackingFresh);

        tracing::info!(epoch = outcome.epoch.0, orphaned = outcome.orphaned, "session reset");
        self.notify(Notification::SessionReset {
            orphaned: outcome.orphaned,
        });
        outcome.orphaned
    }

    // Markers

    /// Place a marker and broadcast it
    ///
    /// The marker stays even when nobody receives it.
    pub fn create_marker(&mut self, pose: Pose, color: Color, size: f32) -> SceneResult<MarkerId> {
        if self.state == TrackingState::Paused {
            return Err(SceneError::SessionPaused);
        }

        let record = MarkerRecord::new(pose, color, size)?;
        let bytes = self.codec.encode(&record)?;
        let id = record.id();

        self.place(record, PeerId::LOCAL);
        self.stats.markers_created += 1;
        tracing::debug!(marker = %id, "marker placed");
        self.notify(Notification::MarkerPlaced(id));

        self.broadcast(&bytes, PayloadKind::Marker);
        Ok(id)
    }

    /// Place a marker where a screen touch lands in the world
    pub fn create_marker_at_touch(
        &mut self,
        point: ScreenPoint,
        color: Color,
        size: f32,
    ) -> SceneResult<MarkerId> {
        if self.state == TrackingState::Paused {
            return Err(SceneError::SessionPaused);
        }

        let pose = self
            .engine
            .project_touch(point)
            .ok_or(SceneError::ProjectionFailed)?;
        self.create_marker(pose, color, size)
    }

    /// Typed receive path for marker bytes
    pub fn receive_marker(&mut self, bytes: &[u8], from: PeerId) -> SceneResult<()> {
        self.ensure_accepting(from)?;
        let record = self.codec.decode::<MarkerRecord>(bytes)?;
        self.apply_received_marker(record, from);
        Ok(())
    }

    fn apply_received_marker(&mut self, record: MarkerRecord, from: PeerId) {
        let id = record.id();
        match self.place(record, from) {
            FoldOutcome::Inserted(_) => {
                self.stats.markers_received += 1;
                tracing::debug!(marker = %id, peer = %from, "marker received");
                self.notify(Notification::MarkerReceived { id, from });
            }
            FoldOutcome::Duplicate => self.stats.duplicates_dropped += 1,
        }
    }

    /// Fold into the field and register an engine anchor for it
    fn place(&mut self, record: MarkerRecord, origin: PeerId) -> FoldOutcome {
        let pose = *record.pose();
        let outcome = self.reconciler.fold_marker(record, origin);
        if let FoldOutcome::Inserted(index) = outcome {
            let anchor = self.engine.add_anchor(pose, AnchorKind::Marker);
            self.reconciler.field_mut().attach_anchor(index, anchor);
        }
        outcome
    }

    // Snapshots

    /// Ask the engine for the current map; completes through the inbox
    pub fn save(&mut self) -> SceneResult<CaptureTicket> {
        let requested = self.request_capture();
        if let Err(e) = &requested {
            self.save_failed(e);
        }
        requested
    }

    fn request_capture(&mut self) -> SceneResult<CaptureTicket> {
        match self.state {
            TrackingState::Paused => return Err(SceneError::SessionPaused),
            TrackingState::Uninitialized => return Err(SceneError::NotInitialized),
            _ => {}
        }

        let mapping = self.engine.mapping_status();
        if self.config.require_mapping_for_save && !mapping.allows_save() {
            return Err(SceneError::MapNotReady(mapping));
        }

        let tx = self.tx.upgrade().ok_or(SceneError::ControllerClosed)?;
        self.next_request += 1;
        let ticket = CaptureTicket {
            epoch: self.reconciler.epoch(),
            request_id: self.next_request,
        };
        if let Some(previous) = self.pending_capture.replace(ticket) {
            tracing::debug!(request = previous.request_id, "capture superseded");
        }

        tracing::debug!(request = ticket.request_id, %mapping, "capturing map");
        self.engine.capture_snapshot(CaptureReply::new(ticket, tx));
        Ok(ticket)
    }

    fn finish_capture(&mut self, ticket: CaptureTicket, result: SceneResult<MapSnapshot>) {
        let current = self.pending_capture == Some(ticket) && ticket.epoch == self.reconciler.epoch();
        if self.state == TrackingState::Paused || !current {
            self.stats.stale_captures_dropped += 1;
            tracing::debug!(request = ticket.request_id, epoch = ticket.epoch.0, "stale capture dropped");
            return;
        }
        self.pending_capture = None;

        let saved = match result {
            Ok(snapshot) => self.persist_and_share(snapshot),
            Err(e) => Err(e),
        };
        if let Err(e) = saved {
            self.save_failed(&e);
        }
    }

    fn persist_and_share(&mut self, snapshot: MapSnapshot) -> SceneResult<()> {
        let snapshot = snapshot.with_provenance(Provenance::Captured);
        let bytes = self.codec.encode(&snapshot)?;
        self.store.save(&bytes)?;

        self.stats.saves_succeeded += 1;
        tracing::info!(len = bytes.len(), "map saved");

        let peers = self.broadcast(&bytes, PayloadKind::Snapshot);
        self.notify(Notification::SnapshotSaved {
            len: bytes.len(),
            peers,
        });
        Ok(())
    }

    /// Drop the save in flight, if any, and report it as failed
    ///
    /// Pausing clears the pending capture without going through here.
    fn abandon_capture(&mut self, reason: &str) {
        if let Some(ticket) = self.pending_capture.take() {
            tracing::debug!(request = ticket.request_id, reason, "pending save abandoned");
            self.save_failed(&SceneError::CaptureFailed(reason.to_string()));
        }
    }

    fn save_failed(&mut self, error: &SceneError) {
        self.stats.saves_failed += 1;
        tracing::warn!(error = %error, "save failed");
        self.notify(Notification::SaveFailed(error.to_string()));
    }

    /// Seed tracking from the saved map
    pub fn load(&mut self) -> SceneResult<()> {
        match self.store.load() {
            Ok(bytes) => self.load_snapshot(&bytes),
            Err(e) => Err(self.load_failed(e)),
        }
    }

    /// Seed tracking from encoded snapshot bytes
    ///
    /// Nothing changes when the bytes do not decode.
    pub fn load_snapshot(&mut self, bytes: &[u8]) -> SceneResult<()> {
        let snapshot = match self.codec.decode::<MapSnapshot>(bytes) {
            Ok(snapshot) => snapshot,
            Err(e) => return Err(self.load_failed(e)),
        };

        self.adopt(snapshot, Provenance::Loaded);
        self.notify(Notification::SnapshotLoaded);
        Ok(())
    }

    fn load_failed(&mut self, error: SceneError) -> SceneError {
        tracing::warn!(error = %error, "load failed");
        self.notify(Notification::LoadFailed(error.to_string()));
        error
    }

    /// Typed receive path for snapshot bytes; replaces the session
    pub fn receive_snapshot(&mut self, bytes: &[u8], from: PeerId) -> SceneResult<()> {
        self.ensure_accepting(from)?;
        let snapshot = self.codec.decode::<MapSnapshot>(bytes)?;
        self.adopt_received(snapshot, from);
        Ok(())
    }

    fn adopt_received(&mut self, snapshot: MapSnapshot, from: PeerId) {
        let outcome = self.adopt(snapshot, Provenance::Received);
        self.notify(Notification::SnapshotReceived {
            from,
            orphaned: outcome.orphaned,
        });
    }

    fn adopt(&mut self, snapshot: MapSnapshot, provenance: Provenance) -> AdoptOutcome {
        let outcome = self.reconciler.adopt_snapshot(snapshot, provenance);
        self.abandon_capture("superseded by a newer map");
        self.engine.adopt_snapshot(self.reconciler.current_snapshot());
        self.stats.snapshots_adopted += 1;
        self.transition(TrackingState::TrackingSeeded);

        tracing::info!(
            %provenance,
            epoch = outcome.epoch.0,
            orphaned = outcome.orphaned,
            "tracking seeded from snapshot"
        );
        outcome
    }

    // Inbound dispatch

    /// Handle untyped bytes from the peer channel
    ///
    /// Kinds are tried snapshot first, then marker. Bytes that decode as
    /// neither are dropped with one warning and change nothing.
    pub fn receive(&mut self, payload: &[u8], from: PeerId) {
        if self.ensure_accepting(from).is_err() {
            return;
        }

        match self.codec.decode_any(payload) {
            Ok(Payload::Snapshot(snapshot)) => self.adopt_received(snapshot, from),
            Ok(Payload::Marker(record)) => self.apply_received_marker(record, from),
            Err(e) => {
                self.stats.payloads_discarded += 1;
                tracing::warn!(peer = %from, len = payload.len(), error = %e, "discarding undecodable payload");
                self.notify(Notification::PayloadDiscarded { from });
            }
        }
    }

    fn ensure_accepting(&mut self, from: PeerId) -> SceneResult<()> {
        if self.state == TrackingState::Paused {
            self.stats.dropped_while_paused += 1;
            tracing::debug!(peer = %from, "paused, inbound payload dropped");
            return Err(SceneError::SessionPaused);
        }
        Ok(())
    }

    fn on_anchor(&mut self, event: AnchorEvent) {
        if event.kind() != AnchorKind::Marker {
            tracing::trace!(anchor = ?event.anchor(), "non-marker anchor ignored");
            return;
        }

        match self
            .reconciler
            .field_mut()
            .update_anchor_pose(event.anchor(), event.pose())
        {
            Some(marker) => tracing::trace!(%marker, "display pose refined"),
            None => tracing::debug!(anchor = ?event.anchor(), "anchor not backed by a marker"),
        }
    }

    fn broadcast(&mut self, bytes: &[u8], kind: PayloadKind) -> usize {
        if !self.transport.has_peers() {
            self.stats.broadcasts_skipped += 1;
            tracing::debug!(%kind, "no peers, broadcast skipped");
            return 0;
        }

        match self.transport.broadcast(bytes) {
            Ok(reached) => {
                self.stats.broadcasts_sent += 1;
                tracing::debug!(%kind, reached, len = bytes.len(), "broadcast");
                reached
            }
            Err(e) => {
                self.stats.broadcasts_failed += 1;
                tracing::warn!(%kind, error = %e, "broadcast failed");
                0
            }
        }
    }

    // Input loop

    /// Apply one input; returns false once the controller has shut down
    pub fn handle_input(&mut self, input: Input) -> bool {
        if self.closed {
            return false;
        }
        self.stats.inputs += 1;

        match input {
            Input::Command(Command::Shutdown) => {
                tracing::info!("controller shutting down");
                self.closed = true;
                return false;
            }
            Input::Command(command) => self.apply_command(command),
            Input::Inbound { payload, from } => self.receive(&payload, from),
            Input::CaptureCompleted { ticket, result } => self.finish_capture(ticket, result),
            Input::Anchor(event) => self.on_anchor(event),
        }
        true
    }

    fn apply_command(&mut self, command: Command) {
        let name = command.name();
        let result = match command {
            Command::Start => {
                self.start();
                Ok(())
            }
            Command::Pause => {
                self.pause();
                Ok(())
            }
            Command::Reset => {
                self.reset();
                Ok(())
            }
            Command::CreateMarker { pose, color, size } => {
                self.create_marker(pose, color, size).map(|_| ())
            }
            Command::CreateMarkerAtTouch { point, color, size } => {
                self.create_marker_at_touch(point, color, size).map(|_| ())
            }
            Command::Save => self.save().map(|_| ()),
            Command::Load => self.load(),
            Command::Shutdown => Ok(()),
        };

        if let Err(e) = result {
            tracing::debug!(command = name, error = %e, "command rejected");
        }
    }

    /// Apply every queued input without waiting
    pub fn tick(&mut self) -> usize {
        let mut handled = 0;
        while !self.closed {
            match self.inbox.try_recv() {
                Ok(input) => {
                    handled += 1;
                    self.handle_input(input);
                }
                Err(_) => break,
            }
        }
        handled
    }

    /// Apply inputs as they arrive until shutdown or until every handle is gone
    pub async fn run(mut self) -> Self {
        tracing::info!(state = %self.state, "controller running");
        while !self.closed {
            let Some(input) = self.inbox.recv().await else {
                break;
            };
            self.handle_input(input);
        }
        self
    }

    // Queries

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn epoch(&self) -> SessionEpoch {
        self.reconciler.epoch()
    }

    pub fn field(&self) -> &MarkerField {
        self.reconciler.field()
    }

    /// Markers in render order
    pub fn markers(&self) -> impl Iterator<Item = &RenderedMarker> {
        self.reconciler.field().iter()
    }

    pub fn marker_count(&self) -> usize {
        self.reconciler.field().len()
    }

    pub fn current_snapshot(&self) -> Option<&MapSnapshot> {
        self.reconciler.current_snapshot()
    }

    pub fn pending_capture(&self) -> Option<CaptureTicket> {
        self.pending_capture
    }

    pub fn persistence_exists(&self) -> bool {
        self.store.exists()
    }

    pub fn connected_peers(&self) -> Vec<PeerInfo> {
        self.transport.connected_peers()
    }

    pub fn status(&self) -> StatusReport {
        let mapping = self.engine.mapping_status();
        StatusReport {
            tracking: self.state,
            mapping,
            peers: self.transport.connected_peers(),
            markers: self.marker_count(),
            has_saved_map: self.store.exists(),
            can_save: self.state.is_tracking()
                && (!self.config.require_mapping_for_save || mapping.allows_save()),
        }
    }

    pub fn pop_notification(&mut self) -> Option<Notification> {
        self.notifications.pop_front()
    }

    pub fn first_launch(&self) -> bool {
        self.flags.first_launch()
    }

    /// Record that onboarding has been shown
    pub fn complete_onboarding(&mut self) -> SceneResult<()> {
        self.flags.set_first_launch(false)
    }

    pub fn stats(&self) -> &ControllerStats {
        &self.stats
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn transition(&mut self, to: TrackingState) {
        if self.state != to {
            tracing::debug!(from = %self.state, %to, "state transition");
        }
        self.state = to;
    }

    fn notify(&mut self, notification: Notification) {
        if self.config.max_notifications == 0 {
            return;
        }
        if self.notifications.len() >= self.config.max_notifications {
            self.notifications.pop_front();
        }
        self.notifications.push_back(notification);
    }
}
