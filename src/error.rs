//! Error taxonomy shared by the sync controller and the boundary routes.
//!
//! Every variant carries a stable machine-readable [`code`](SyncError::code)
//! and an HTTP [`status`](SyncError::status); the server turns them into the
//! `{ "error": { "code", "message" } }` body.

use axum::http::StatusCode;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum SyncError {
    /// The request was not issued from the designated documentation tenant.
    #[error("documentation sync is only available on site {designated}, not {actual}")]
    InvalidContext { designated: i64, actual: String },

    /// The target content type is not registered in the current tenant.
    #[error("content type '{0}' is not registered for this site")]
    UnsupportedSchema(String),

    /// A required capability or collaborator is not wired in.
    #[error("capability '{0}' is not available")]
    CapabilityUnavailable(String),

    #[error("failed to render markdown: {0}")]
    Render(String),

    #[error("failed to create platform term '{slug}': {source}")]
    TermCreation {
        slug: String,
        #[source]
        source: StoreError,
    },

    /// The store rejected a write. The message is the store's, verbatim.
    #[error("{0}")]
    Persistence(#[from] StoreError),

    /// The record write succeeded but its platform association did not.
    #[error("document {id} was written but its platform association failed: {source}")]
    PartialWrite {
        id: i64,
        #[source]
        source: StoreError,
    },

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// An upstream capability answered with a failure.
    #[error("capability '{name}' failed: {message}")]
    Capability { name: String, message: String },
}

impl SyncError {
    pub fn code(&self) -> &'static str {
        match self {
            SyncError::InvalidContext { .. } => "invalid_site",
            SyncError::UnsupportedSchema(_) => "missing_post_type",
            SyncError::CapabilityUnavailable(_) => "capability_unavailable",
            SyncError::Render(_) => "render_error",
            SyncError::TermCreation { .. } => "term_creation_failed",
            SyncError::Persistence(_) => "persistence_error",
            SyncError::PartialWrite { .. } => "partial_write",
            SyncError::Validation(_) => "bad_request",
            SyncError::NotFound(_) => "not_found",
            SyncError::Capability { .. } => "capability_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            SyncError::InvalidContext { .. } | SyncError::Validation(_) => StatusCode::BAD_REQUEST,
            SyncError::UnsupportedSchema(_)
            | SyncError::Render(_)
            | SyncError::TermCreation { .. }
            | SyncError::PartialWrite { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            SyncError::CapabilityUnavailable(_) => StatusCode::NOT_IMPLEMENTED,
            SyncError::Persistence(StoreError::Conflict(_)) => StatusCode::CONFLICT,
            SyncError::Persistence(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            SyncError::Persistence(StoreError::Backend(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            SyncError::NotFound(_) => StatusCode::NOT_FOUND,
            SyncError::Capability { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// Whether the caller may reasonably retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::Persistence(StoreError::Conflict(_) | StoreError::Backend(_))
                | SyncError::PartialWrite { .. }
                | SyncError::Capability { .. }
        )
    }
}
