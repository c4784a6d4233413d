//! Backend collaborator contract.
//!
//! The engine is transport-agnostic: anything that can list, create, update
//! and delete notes (and list/create/delete tags) can back a board. The
//! [`crate::http::HttpBackend`] speaks the REST flavor; tests plug in mocks.

use serde::{Deserialize, Serialize};

use crate::doc::{Importance, Note, NoteDraft, NoteId, NotePatch, Tag, TagId};
use crate::error::ErrorCode;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by backend calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The request never produced a response (connection, timeout, ...).
    #[error("request failed: {0}")]
    Request(String),

    /// The backend answered with a non-success status.
    #[error("backend returned status {status}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("response parse failed: {0}")]
    Parse(String),

    /// The HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// Required configuration is missing or malformed.
    #[error("invalid backend config: {0}")]
    InvalidConfig(String),
}

impl ErrorCode for BackendError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Request(_) => "E_BACKEND_REQUEST",
            Self::Status { .. } => "E_BACKEND_STATUS",
            Self::Parse(_) => "E_BACKEND_PARSE",
            Self::HttpClientBuild(_) => "E_BACKEND_CLIENT",
            Self::InvalidConfig(_) => "E_BACKEND_CONFIG",
        }
    }
}

// =============================================================================
// FILTER
// =============================================================================

/// Criteria for listing notes. Empty fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteFilter {
    /// Free-text query over note content.
    pub query: Option<String>,
    /// Notes must reference at least one of these tags.
    pub tag_ids: Vec<TagId>,
    pub importance: Option<Importance>,
    pub locked: Option<bool>,
}

impl NoteFilter {
    /// Query-string pairs for the filter, omitting empty criteria.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(q) = self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            pairs.push(("q", q.to_owned()));
        }
        if !self.tag_ids.is_empty() {
            let tags = self.tag_ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(",");
            pairs.push(("tags", tags));
        }
        if let Some(importance) = self.importance {
            pairs.push(("importance", importance.as_str().to_owned()));
        }
        if let Some(locked) = self.locked {
            pairs.push(("locked", locked.to_string()));
        }
        pairs
    }
}

// =============================================================================
// TRAITS
// =============================================================================

/// Note persistence operations consumed by the board session.
#[async_trait::async_trait]
pub trait NoteBackend: Send + Sync {
    /// List notes matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] if the call fails or the body is malformed.
    async fn list(&self, filter: &NoteFilter) -> Result<Vec<Note>, BackendError>;

    /// Create a note; the backend assigns its id.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] if the call fails or the body is malformed.
    async fn create(&self, draft: &NoteDraft) -> Result<Note, BackendError>;

    /// Apply a partial update and return the stored note.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] if the call fails or the body is malformed.
    async fn update(&self, id: NoteId, patch: &NotePatch) -> Result<Note, BackendError>;

    /// Delete a note.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] if the call fails.
    async fn delete(&self, id: NoteId) -> Result<(), BackendError>;
}

/// Tag operations, independent of the note board.
#[async_trait::async_trait]
pub trait TagBackend: Send + Sync {
    /// # Errors
    ///
    /// Returns a [`BackendError`] if the call fails or the body is malformed.
    async fn list_tags(&self) -> Result<Vec<Tag>, BackendError>;

    /// # Errors
    ///
    /// Returns a [`BackendError`] if the call fails or the body is malformed.
    async fn create_tag(&self, name: &str, color: &str) -> Result<Tag, BackendError>;

    /// # Errors
    ///
    /// Returns a [`BackendError`] if the call fails.
    async fn delete_tag(&self, id: TagId) -> Result<(), BackendError>;
}
