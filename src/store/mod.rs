//! Storage abstraction for the gateway.
//!
//! [`DocumentRepository`] and [`TaxonomyRepository`] define every storage
//! operation the sync controller needs, so that the controller can run
//! against SQLite in production and against [`memory::InMemoryStore`] in
//! tests.
//!
//! Implementations must be `Send + Sync` to work with the async runtime.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ContactSubmission, PlatformTerm, StoredDocument};

/// A storage failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Backend(String),
}

/// Documents keyed by their external `source_file`.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`find_by_external_key`](DocumentRepository::find_by_external_key) | Exact `source_file` lookup |
/// | [`get`](DocumentRepository::get) | Lookup by id |
/// | [`upsert`](DocumentRepository::upsert) | Insert when `id` is `None`, otherwise update in place |
/// | [`set_terms`](DocumentRepository::set_terms) | Replace the document's platform terms |
/// | [`terms_of`](DocumentRepository::terms_of) | Slugs of the document's platform terms |
/// | [`clear_fingerprint`](DocumentRepository::clear_fingerprint) | Forget the stored sync hash |
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Returns the document stored under `source_file`. If the backend
    /// holds several, only the first is returned.
    async fn find_by_external_key(
        &self,
        source_file: &str,
    ) -> Result<Option<StoredDocument>, StoreError>;

    async fn get(&self, id: i64) -> Result<Option<StoredDocument>, StoreError>;

    /// Inserts `doc` if it has no id, otherwise overwrites the row with
    /// that id. Returns the id written.
    ///
    /// An insert whose `source_file` is already stored fails with
    /// [`StoreError::Conflict`].
    async fn upsert(&self, doc: &StoredDocument) -> Result<i64, StoreError>;

    /// Replaces the full set of terms associated with document `id`.
    async fn set_terms(&self, id: i64, term_ids: &[i64]) -> Result<(), StoreError>;

    async fn terms_of(&self, id: i64) -> Result<Vec<String>, StoreError>;

    async fn clear_fingerprint(&self, id: i64) -> Result<(), StoreError>;
}

/// Platform classification terms keyed by slug.
#[async_trait]
pub trait TaxonomyRepository: Send + Sync {
    async fn find_term_by_slug(&self, slug: &str) -> Result<Option<PlatformTerm>, StoreError>;

    /// Creates a term. A slug that already exists fails with
    /// [`StoreError::Conflict`].
    async fn create_term(&self, name: &str, slug: &str) -> Result<PlatformTerm, StoreError>;
}

/// Persisted contact-form submissions.
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Stores a validated submission and returns its id.
    async fn save_contact(&self, submission: &ContactSubmission) -> Result<i64, StoreError>;
}
