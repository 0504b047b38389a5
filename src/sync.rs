//! Documentation sync controller.
//!
//! Idempotent upsert of one documentation unit, keyed by `source_file`:
//!
//! ```text
//! validate ─▶ render ─▶ anchor ─▶ fingerprint ─▶ lookup ─┬─▶ skipped
//!                                                        └─▶ resolve term ─▶ write ─▶ associate ─▶ created | updated
//! ```
//!
//! Nothing is written before both tenant checks pass. When the stored
//! fingerprint matches and `force` is not set, the call returns `skipped`
//! without touching the store.
//!
//! The record write and the term association are separate writes. The
//! association is retried; if it still fails the stored fingerprint is
//! cleared, so the next sync of the same record is not skipped, and
//! [`SyncError::PartialWrite`] is returned with the written id.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::DocsConfig;
use crate::error::SyncError;
use crate::fingerprint::record_fingerprint;
use crate::models::{DocumentRecord, StoredDocument, SyncAction, SyncOutcome};
use crate::render::MarkdownRenderer;
use crate::slug::{add_heading_anchors, slugify, HeadingAnchorSet};
use crate::store::{DocumentRepository, TaxonomyRepository};
use crate::tenant::TenantContext;
use crate::terms::PlatformTermResolver;

/// Where synced documents go and how association failures are retried.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub site_id: i64,
    pub post_type: String,
    pub status: String,
    pub association_attempts: u32,
    pub association_backoff: Duration,
}

impl From<&DocsConfig> for SyncSettings {
    fn from(docs: &DocsConfig) -> Self {
        Self {
            site_id: docs.site_id,
            post_type: docs.post_type.clone(),
            status: docs.status.clone(),
            association_attempts: docs.association_attempts.max(1),
            association_backoff: Duration::from_millis(docs.association_backoff_ms),
        }
    }
}

/// Orchestrates renderer, hasher and repositories for one sync call.
///
/// Holds no per-call state; one instance serves every request.
pub struct SyncController {
    settings: SyncSettings,
    renderer: Arc<dyn MarkdownRenderer>,
    documents: Arc<dyn DocumentRepository>,
    terms: PlatformTermResolver,
}

impl SyncController {
    pub fn new(
        settings: SyncSettings,
        renderer: Arc<dyn MarkdownRenderer>,
        documents: Arc<dyn DocumentRepository>,
        taxonomy: Arc<dyn TaxonomyRepository>,
    ) -> Self {
        Self {
            settings,
            renderer,
            documents,
            terms: PlatformTermResolver::new(taxonomy),
        }
    }

    pub fn documents(&self) -> &Arc<dyn DocumentRepository> {
        &self.documents
    }

    /// Syncs one record. See the module docs for the full sequence.
    pub async fn sync(
        &self,
        ctx: &dyn TenantContext,
        record: DocumentRecord,
    ) -> Result<SyncOutcome, SyncError> {
        self.validate(ctx, &record)?;

        let content = self.render(&record.content_raw)?;
        let hash = record_fingerprint(&record);

        let existing = self
            .documents
            .find_by_external_key(&record.source_file)
            .await?;

        if let Some(existing) = &existing {
            if !record.force && existing.sync_hash == hash {
                let id = stored_id(existing)?;
                debug!(source_file = %record.source_file, id, "unchanged, skipping");
                return Ok(SyncOutcome::new(SyncAction::Skipped, id));
            }
        }

        let term_id = self.terms.resolve(&record.platform_slug).await?;

        let slug = if record.slug.trim().is_empty() {
            slugify(&record.title)
        } else {
            record.slug.clone()
        };

        let (action, existing_id) = match &existing {
            Some(doc) => (SyncAction::Updated, Some(stored_id(doc)?)),
            None => (SyncAction::Created, None),
        };

        let doc = StoredDocument {
            id: existing_id,
            source_file: record.source_file.clone(),
            title: record.title.clone(),
            slug,
            excerpt: record.excerpt.clone(),
            content,
            post_type: self.settings.post_type.clone(),
            status: self.settings.status.clone(),
            sync_hash: hash,
            sync_timestamp: record.timestamp.clone(),
            filesize: record.filesize,
        };

        let id = self.documents.upsert(&doc).await.map_err(|e| {
            error!(source_file = %record.source_file, error = %e, "document write rejected");
            SyncError::Persistence(e)
        })?;

        self.associate(id, term_id).await?;

        info!(
            source_file = %record.source_file,
            id,
            action = %action,
            platform = %record.platform_slug,
            "synced document"
        );
        Ok(SyncOutcome::new(action, id))
    }

    fn validate(&self, ctx: &dyn TenantContext, record: &DocumentRecord) -> Result<(), SyncError> {
        if !ctx.current_tenant_matches(self.settings.site_id) {
            return Err(SyncError::InvalidContext {
                designated: self.settings.site_id,
                actual: ctx
                    .current_site()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "none".to_string()),
            });
        }
        if !ctx.post_type_registered(&self.settings.post_type) {
            return Err(SyncError::UnsupportedSchema(self.settings.post_type.clone()));
        }

        for (field, value) in [
            ("source_file", &record.source_file),
            ("title", &record.title),
            ("platform_slug", &record.platform_slug),
        ] {
            if value.trim().is_empty() {
                return Err(SyncError::Validation(format!("{} must not be empty", field)));
            }
        }
        Ok(())
    }

    fn render(&self, markdown: &str) -> Result<String, SyncError> {
        let html = self.renderer.render(markdown)?;
        let mut anchors = HeadingAnchorSet::new();
        Ok(add_heading_anchors(&html, &mut anchors))
    }

    async fn associate(&self, id: i64, term_id: i64) -> Result<(), SyncError> {
        let attempts = self.settings.association_attempts.max(1);
        let mut last_err = None;

        for attempt in 1..=attempts {
            if attempt > 1 {
                tokio::time::sleep(self.settings.association_backoff * (attempt - 1)).await;
            }
            match self.documents.set_terms(id, &[term_id]).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(id, attempt, attempts, error = %e, "platform association failed");
                    last_err = Some(e);
                }
            }
        }

        let source = match last_err {
            Some(e) => e,
            None => return Ok(()),
        };

        // Without a stored hash the next sync rewrites the record and
        // retries the association instead of skipping.
        if let Err(e) = self.documents.clear_fingerprint(id).await {
            error!(id, error = %e, "could not clear fingerprint after failed association");
        }
        Err(SyncError::PartialWrite { id, source })
    }
}

fn stored_id(doc: &StoredDocument) -> Result<i64, SyncError> {
    doc.id.ok_or_else(|| {
        SyncError::Persistence(crate::store::StoreError::Backend(format!(
            "stored document {} has no id",
            doc.source_file
        )))
    })
}
