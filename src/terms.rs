//! Platform term resolution.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::store::{StoreError, TaxonomyRepository};

/// Display name for an auto-created term: hyphens become spaces and the
/// first letter of every word is uppercased (`"live-music"` → `"Live Music"`).
pub fn display_name(slug: &str) -> String {
    slug.replace('-', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Finds or creates the platform term for a slug.
#[derive(Clone)]
pub struct PlatformTermResolver {
    taxonomy: Arc<dyn TaxonomyRepository>,
}

impl PlatformTermResolver {
    pub fn new(taxonomy: Arc<dyn TaxonomyRepository>) -> Self {
        Self { taxonomy }
    }

    /// Returns the id of the term with exactly this slug, creating it on
    /// first use.
    ///
    /// A concurrent creator can win between the lookup and the insert; the
    /// resulting conflict is treated as "already exists" and the term is
    /// looked up again.
    pub async fn resolve(&self, slug: &str) -> Result<i64, SyncError> {
        if let Some(term) = self.taxonomy.find_term_by_slug(slug).await? {
            return Ok(term.id);
        }

        let name = display_name(slug);
        match self.taxonomy.create_term(&name, slug).await {
            Ok(term) => {
                info!(slug, name = %term.name, id = term.id, "created platform term");
                Ok(term.id)
            }
            Err(StoreError::Conflict(msg)) => {
                warn!(slug, conflict = %msg, "platform term created concurrently, re-resolving");
                match self.taxonomy.find_term_by_slug(slug).await? {
                    Some(term) => {
                        debug!(slug, id = term.id, "re-resolved platform term");
                        Ok(term.id)
                    }
                    None => Err(SyncError::TermCreation {
                        slug: slug.to_string(),
                        source: StoreError::Conflict(msg),
                    }),
                }
            }
            Err(source) => Err(SyncError::TermCreation {
                slug: slug.to_string(),
                source,
            }),
        }
    }
}
