//! In-memory repositories for tests and `gateway serve --ephemeral`.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock` for thread safety.
//! Enforces the same uniqueness rules as the SQLite schema: one document
//! per `source_file`, one term per slug.
//!
//! Unit tests get failure injection hooks to drive the controller's error
//! paths; they are compiled out of regular builds.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::models::{ContactSubmission, PlatformTerm, StoredDocument};

use super::{ContactRepository, DocumentRepository, StoreError, TaxonomyRepository};

/// In-memory document and taxonomy store.
pub struct InMemoryStore {
    docs: RwLock<BTreeMap<i64, StoredDocument>>,
    doc_terms: RwLock<HashMap<i64, Vec<i64>>>,
    terms: RwLock<Vec<PlatformTerm>>,
    contacts: RwLock<Vec<ContactSubmission>>,
    next_doc_id: AtomicUsize,
    next_term_id: AtomicUsize,
    writes: AtomicUsize,
    fail_set_terms: AtomicU32,
    fail_upsert: RwLock<Option<StoreError>>,
    hidden_term_lookups: AtomicU32,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(BTreeMap::new()),
            doc_terms: RwLock::new(HashMap::new()),
            terms: RwLock::new(Vec::new()),
            contacts: RwLock::new(Vec::new()),
            next_doc_id: AtomicUsize::new(1),
            next_term_id: AtomicUsize::new(1),
            writes: AtomicUsize::new(0),
            fail_set_terms: AtomicU32::new(0),
            fail_upsert: RwLock::new(None),
            hidden_term_lookups: AtomicU32::new(0),
        }
    }

    /// Number of successful document writes (inserts and updates).
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn document_count(&self) -> usize {
        self.docs.read().unwrap().len()
    }

    pub fn term_count(&self) -> usize {
        self.terms.read().unwrap().len()
    }

    /// Contact submissions saved so far, oldest first.
    pub fn contacts(&self) -> Vec<ContactSubmission> {
        self.contacts.read().unwrap().clone()
    }

    /// Makes the next `n` calls to `set_terms` fail.
    #[cfg(test)]
    pub fn fail_next_set_terms(&self, n: u32) {
        self.fail_set_terms.store(n, Ordering::SeqCst);
    }

    /// Makes every `upsert` fail with `err` until cleared with `None`.
    #[cfg(test)]
    pub fn fail_upserts_with(&self, err: Option<StoreError>) {
        *self.fail_upsert.write().unwrap() = err;
    }

    /// Makes the next `n` term lookups report "not found" even when the
    /// term exists, simulating a concurrent creator that has not been
    /// observed yet.
    #[cfg(test)]
    pub fn hide_terms_from_next_lookups(&self, n: u32) {
        self.hidden_term_lookups.store(n, Ordering::SeqCst);
    }

    fn take_one(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentRepository for InMemoryStore {
    async fn find_by_external_key(
        &self,
        source_file: &str,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let docs = self.docs.read().unwrap();
        Ok(docs
            .values()
            .find(|d| d.source_file == source_file)
            .cloned())
    }

    async fn get(&self, id: i64) -> Result<Option<StoredDocument>, StoreError> {
        Ok(self.docs.read().unwrap().get(&id).cloned())
    }

    async fn upsert(&self, doc: &StoredDocument) -> Result<i64, StoreError> {
        if let Some(err) = self.fail_upsert.read().unwrap().clone() {
            return Err(err);
        }

        let mut docs = self.docs.write().unwrap();
        let id = match doc.id {
            Some(id) => {
                if !docs.contains_key(&id) {
                    return Err(StoreError::NotFound(format!("document {}", id)));
                }
                if docs
                    .values()
                    .any(|d| d.id != Some(id) && d.source_file == doc.source_file)
                {
                    return Err(StoreError::Conflict(format!(
                        "source_file {} already stored",
                        doc.source_file
                    )));
                }
                id
            }
            None => {
                if docs.values().any(|d| d.source_file == doc.source_file) {
                    return Err(StoreError::Conflict(format!(
                        "source_file {} already stored",
                        doc.source_file
                    )));
                }
                self.next_doc_id.fetch_add(1, Ordering::SeqCst) as i64
            }
        };

        let mut stored = doc.clone();
        stored.id = Some(id);
        docs.insert(id, stored);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    async fn set_terms(&self, id: i64, term_ids: &[i64]) -> Result<(), StoreError> {
        if Self::take_one(&self.fail_set_terms) {
            return Err(StoreError::Backend("term association rejected".to_string()));
        }
        if !self.docs.read().unwrap().contains_key(&id) {
            return Err(StoreError::NotFound(format!("document {}", id)));
        }
        let mut ids = term_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        self.doc_terms.write().unwrap().insert(id, ids);
        Ok(())
    }

    async fn terms_of(&self, id: i64) -> Result<Vec<String>, StoreError> {
        let doc_terms = self.doc_terms.read().unwrap();
        let terms = self.terms.read().unwrap();
        let mut slugs: Vec<String> = doc_terms
            .get(&id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|tid| terms.iter().find(|t| t.id == *tid))
                    .map(|t| t.slug.clone())
                    .collect()
            })
            .unwrap_or_default();
        slugs.sort();
        Ok(slugs)
    }

    async fn clear_fingerprint(&self, id: i64) -> Result<(), StoreError> {
        let mut docs = self.docs.write().unwrap();
        let doc = docs
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("document {}", id)))?;
        doc.sync_hash.clear();
        Ok(())
    }
}

#[async_trait]
impl TaxonomyRepository for InMemoryStore {
    async fn find_term_by_slug(&self, slug: &str) -> Result<Option<PlatformTerm>, StoreError> {
        if Self::take_one(&self.hidden_term_lookups) {
            return Ok(None);
        }
        let terms = self.terms.read().unwrap();
        Ok(terms.iter().find(|t| t.slug == slug).cloned())
    }

    async fn create_term(&self, name: &str, slug: &str) -> Result<PlatformTerm, StoreError> {
        let mut terms = self.terms.write().unwrap();
        if terms.iter().any(|t| t.slug == slug) {
            return Err(StoreError::Conflict(format!("term slug {} exists", slug)));
        }
        let term = PlatformTerm {
            id: self.next_term_id.fetch_add(1, Ordering::SeqCst) as i64,
            slug: slug.to_string(),
            name: name.to_string(),
        };
        terms.push(term.clone());
        Ok(term)
    }
}

#[async_trait]
impl ContactRepository for InMemoryStore {
    async fn save_contact(&self, submission: &ContactSubmission) -> Result<i64, StoreError> {
        let mut contacts = self.contacts.write().unwrap();
        contacts.push(submission.clone());
        Ok(contacts.len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(source_file: &str) -> StoredDocument {
        StoredDocument {
            id: None,
            source_file: source_file.to_string(),
            title: "T".to_string(),
            slug: "t".to_string(),
            excerpt: String::new(),
            content: "<p>x</p>".to_string(),
            post_type: "documentation".to_string(),
            status: "publish".to_string(),
            sync_hash: "abc".to_string(),
            sync_timestamp: String::new(),
            filesize: 1,
        }
    }

    #[tokio::test]
    async fn test_insert_then_update_in_place() {
        let store = InMemoryStore::new();
        let id = store.upsert(&doc("a.md")).await.unwrap();

        let mut existing = store.find_by_external_key("a.md").await.unwrap().unwrap();
        assert_eq!(existing.id, Some(id));
        existing.title = "Renamed".to_string();
        assert_eq!(store.upsert(&existing).await.unwrap(), id);

        assert_eq!(store.document_count(), 1);
        assert_eq!(store.get(id).await.unwrap().unwrap().title, "Renamed");
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_conflict() {
        let store = InMemoryStore::new();
        store.upsert(&doc("a.md")).await.unwrap();
        let err = store.upsert(&doc("a.md")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_set_terms_replaces() {
        let store = InMemoryStore::new();
        let id = store.upsert(&doc("a.md")).await.unwrap();
        let ios = store.create_term("Ios", "ios").await.unwrap();
        let android = store.create_term("Android", "android").await.unwrap();

        store.set_terms(id, &[ios.id]).await.unwrap();
        store.set_terms(id, &[android.id]).await.unwrap();
        assert_eq!(store.terms_of(id).await.unwrap(), vec!["android".to_string()]);
    }

    #[tokio::test]
    async fn test_duplicate_term_is_conflict() {
        let store = InMemoryStore::new();
        store.create_term("Ios", "ios").await.unwrap();
        let err = store.create_term("iOS", "ios").await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.term_count(), 1);
    }

    #[tokio::test]
    async fn test_clear_fingerprint() {
        let store = InMemoryStore::new();
        let id = store.upsert(&doc("a.md")).await.unwrap();
        store.clear_fingerprint(id).await.unwrap();
        assert_eq!(store.get(id).await.unwrap().unwrap().sync_hash, "");
    }
}
