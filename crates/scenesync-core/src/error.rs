//! Error types for SceneSync

use std::path::PathBuf;

use thiserror::Error;

use crate::{MappingStatus, PayloadKind};

/// Core SceneSync errors
#[derive(Error, Debug)]
pub enum SceneError {
    // Wire errors
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Buffer too short: expected {expected}, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },

    #[error("Invalid envelope magic")]
    InvalidMagic,

    #[error("Unsupported wire version: {0}")]
    UnsupportedVersion(u8),

    #[error("Unknown payload kind: {0:#04x}")]
    UnknownPayloadKind(u8),

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: PayloadKind,
        actual: PayloadKind,
    },

    #[error("Envelope integrity check failed")]
    IntegrityCheckFailed,

    #[error("Payload too large: {size} > {max}")]
    PayloadTooLarge { size: usize, max: usize },

    // Storage errors
    #[error("No saved map at {0}")]
    NotFound(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    // Capture errors
    #[error("Snapshot capture failed: {0}")]
    CaptureFailed(String),

    #[error("Map not ready for saving: mapping status is {0}")]
    MapNotReady(MappingStatus),

    // Session errors
    #[error("Session is paused")]
    SessionPaused,

    #[error("Tracking session has not been started")]
    NotInitialized,

    #[error("Touch point does not project into the map")]
    ProjectionFailed,

    #[error("Controller is no longer running")]
    ControllerClosed,

    // Transport errors
    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Unknown peer: {0}")]
    UnknownPeer(String),
}

impl SceneError {
    /// Malformed or unexpected-type payload: discard, log, continue
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            SceneError::InvalidPayload(_)
                | SceneError::BufferTooShort { .. }
                | SceneError::InvalidMagic
                | SceneError::UnsupportedVersion(_)
                | SceneError::UnknownPayloadKind(_)
                | SceneError::TypeMismatch { .. }
                | SceneError::IntegrityCheckFailed
                | SceneError::PayloadTooLarge { .. }
        )
    }

    /// Disk read/write failure, including a missing map
    pub fn is_io_error(&self) -> bool {
        matches!(self, SceneError::NotFound(_) | SceneError::Io { .. })
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SceneError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for SceneSync operations
pub type SceneResult<T> = Result<T, SceneError>;
