//! Core data models used throughout the gateway.
//!
//! These types represent the documentation records submitted for sync, their
//! persisted projection, platform classification terms, and the outcome
//! reported back to the caller.

use serde::{Deserialize, Serialize};

/// A documentation unit submitted for synchronization.
///
/// `source_file` is the external key: it matches a submission to the
/// document stored by an earlier sync.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentRecord {
    pub source_file: String,
    pub title: String,
    /// Raw Markdown body.
    #[serde(rename = "content")]
    pub content_raw: String,
    pub platform_slug: String,
    pub filesize: i64,
    pub timestamp: String,
    pub force: bool,
    pub slug: String,
    pub excerpt: String,
}

/// Persisted projection of a [`DocumentRecord`].
///
/// `id` is `None` until the repository has assigned one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredDocument {
    pub id: Option<i64>,
    pub source_file: String,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    /// Rendered HTML.
    pub content: String,
    pub post_type: String,
    pub status: String,
    pub sync_hash: String,
    pub sync_timestamp: String,
    pub filesize: i64,
}

/// A platform classification term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformTerm {
    pub id: i64,
    pub slug: String,
    pub name: String,
}

/// What a sync did with the submitted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Created,
    Updated,
    Skipped,
}

impl SyncAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncAction::Created => "created",
            SyncAction::Updated => "updated",
            SyncAction::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for SyncAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful sync result, serialized as the HTTP response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub success: bool,
    pub action: SyncAction,
    pub id: i64,
}

impl SyncOutcome {
    pub fn new(action: SyncAction, id: i64) -> Self {
        Self {
            success: true,
            action,
            id,
        }
    }
}

/// Stored document plus its platform terms, as returned by `GET /docs/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentView {
    #[serde(flatten)]
    pub document: StoredDocument,
    pub platforms: Vec<String>,
}

/// A contact-form submission as received from the client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub message: String,
    #[serde(default, skip_serializing)]
    pub turnstile_token: Option<String>,
}

/// Acknowledgement returned for an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactReceipt {
    pub success: bool,
    pub id: i64,
}
