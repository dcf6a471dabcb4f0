//! Scripted tracking engine

use std::collections::BTreeMap;

use scenesync_core::{AnchorId, AnchorKind, MapSnapshot, MappingStatus, Pose, ScreenPoint};
use scenesync_runtime::{AnchorEvent, CaptureReply, TrackingEngine};

/// How the next capture request is answered
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum CaptureMode {
    /// Answer immediately with the current map
    #[default]
    Immediate,
    /// Answer immediately with an error
    Fail(String),
    /// Answer immediately with no map
    Empty,
    /// Hold the reply until `release_captures`
    Deferred,
}

/// Screen size used for touch projection
pub const VIEWPORT: (f32, f32) = (390.0, 844.0);

/// Distance in front of the camera where touches land
pub const TOUCH_DEPTH: f32 = 0.2;

/// Deterministic stand-in for a camera tracking engine
#[derive(Debug)]
pub struct SimTrackingEngine {
    pub mapping: MappingStatus,
    pub capture_mode: CaptureMode,
    running: bool,
    /// Session restarts, seeded or not
    restarts: u32,
    seed: Option<MapSnapshot>,
    anchors: BTreeMap<AnchorId, (Pose, AnchorKind)>,
    next_anchor: u64,
    deferred: Vec<CaptureReply>,
    captures_requested: u32,
}

impl SimTrackingEngine {
    pub fn new() -> Self {
        SimTrackingEngine {
            mapping: MappingStatus::NotAvailable,
            capture_mode: CaptureMode::Immediate,
            running: false,
            restarts: 0,
            seed: None,
            anchors: BTreeMap::new(),
            next_anchor: 1,
            deferred: Vec::new(),
            captures_requested: 0,
        }
    }

    /// Engine that has already mapped its surroundings
    pub fn mapped() -> Self {
        SimTrackingEngine {
            mapping: MappingStatus::Mapped,
            ..Self::new()
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    pub fn seed(&self) -> Option<&MapSnapshot> {
        self.seed.as_ref()
    }

    pub fn anchor_count(&self) -> usize {
        self.anchors.len()
    }

    pub fn captures_requested(&self) -> u32 {
        self.captures_requested
    }

    /// Current map: the seed plus one record per anchor
    pub fn current_map(&self) -> MapSnapshot {
        MapSnapshot::new(1, map_bytes(self.seed.as_ref(), self.anchors.values()))
    }

    /// Answer every held capture with the current map
    pub fn release_captures(&mut self) -> usize {
        let map = self.current_map();
        let replies: Vec<CaptureReply> = self.deferred.drain(..).collect();
        let count = replies.len();
        for reply in replies {
            reply.complete(Ok(map.clone()));
        }
        count
    }

    /// Take held capture replies to answer by hand
    pub fn take_captures(&mut self) -> Vec<CaptureReply> {
        self.deferred.drain(..).collect()
    }

    /// Nudge every anchor upward, as tracking refinement would
    pub fn refine_anchors(&mut self, dy: f32) -> Vec<AnchorEvent> {
        self.anchors
            .iter_mut()
            .map(|(&anchor, (pose, kind))| {
                let [x, y, z] = pose.translation();
                *pose = Pose::from_translation(x, y + dy, z);
                AnchorEvent::Updated {
                    anchor,
                    kind: *kind,
                    pose: *pose,
                }
            })
            .collect()
    }

    /// Register a non-marker anchor, as plane detection would
    pub fn detect_plane(&mut self, pose: Pose) -> AnchorEvent {
        let anchor = self.add_anchor(pose, AnchorKind::Plane);
        AnchorEvent::Added {
            anchor,
            kind: AnchorKind::Plane,
            pose,
        }
    }
}

impl Default for SimTrackingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackingEngine for SimTrackingEngine {
    fn start(&mut self) {
        self.running = true;
    }

    fn pause(&mut self) {
        self.running = false;
    }

    fn adopt_snapshot(&mut self, seed: Option<&MapSnapshot>) {
        self.running = true;
        self.restarts += 1;
        self.anchors.clear();
        self.seed = seed.cloned();
        if seed.is_some() {
            // Relocalised against the seed
            self.mapping = MappingStatus::Mapped;
        }
    }

    fn capture_snapshot(&mut self, reply: CaptureReply) {
        self.captures_requested += 1;
        match &self.capture_mode {
            CaptureMode::Immediate => reply.complete(Ok(self.current_map())),
            CaptureMode::Fail(reason) => reply.fail(reason.clone()),
            CaptureMode::Empty => reply.complete_with(None),
            CaptureMode::Deferred => self.deferred.push(reply),
        }
    }

    fn project_touch(&self, point: ScreenPoint) -> Option<Pose> {
        let (width, height) = VIEWPORT;
        if !self.running || point.x < 0.0 || point.y < 0.0 || point.x > width || point.y > height {
            return None;
        }

        let x = (point.x / width - 0.5) * TOUCH_DEPTH;
        let y = (0.5 - point.y / height) * TOUCH_DEPTH;
        Some(Pose::from_translation(x, y, -TOUCH_DEPTH))
    }

    fn add_anchor(&mut self, pose: Pose, kind: AnchorKind) -> AnchorId {
        let anchor = AnchorId::new(self.next_anchor);
        self.next_anchor += 1;
        self.anchors.insert(anchor, (pose, kind));
        anchor
    }

    fn mapping_status(&self) -> MappingStatus {
        self.mapping
    }
}

/// Opaque but deterministic map bytes
fn map_bytes<'a>(
    seed: Option<&MapSnapshot>,
    anchors: impl Iterator<Item = &'a (Pose, AnchorKind)>,
) -> Vec<u8> {
    let mut out = seed.map(|s| s.data.to_vec()).unwrap_or_default();
    for (pose, kind) in anchors {
        out.push(match kind {
            AnchorKind::Marker => b'M',
            AnchorKind::Plane => b'P',
            AnchorKind::Other => b'O',
        });
        for v in pose.translation() {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }
    out
}
