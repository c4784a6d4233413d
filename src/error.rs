//! Engine error taxonomy.
//!
//! `BoardError` covers everything the engine rejects synchronously, before any
//! optimistic mutation touches the registry. Persistence failures are not
//! errors of the calling operation: they arrive later as
//! [`crate::sync::Notice`]s after the optimistic change has been rolled back.

use crate::doc::NoteId;

/// Stable machine-readable code for an error, used in logs and notices.
pub trait ErrorCode {
    fn error_code(&self) -> &'static str;
}

/// Synchronous rejection of a board operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BoardError {
    /// The caller's role may not modify the board.
    #[error("no permission to modify the board")]
    PermissionDenied,
    #[error("note not found: {0}")]
    NotFound(NoteId),
    /// The note is locked and the caller cannot override locks.
    #[error("note is locked: {0}")]
    Locked(NoteId),
    #[error("size {width}x{height} is below the minimum {min_width}x{min_height}")]
    BelowMinimumSize { width: f64, height: f64, min_width: f64, min_height: f64 },
}

impl ErrorCode for BoardError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "E_PERMISSION_DENIED",
            Self::NotFound(_) => "E_NOTE_NOT_FOUND",
            Self::Locked(_) => "E_NOTE_LOCKED",
            Self::BelowMinimumSize { .. } => "E_BELOW_MINIMUM_SIZE",
        }
    }
}
