//! Application wiring.
//!
//! Builds every collaborator explicitly from the configuration: the
//! repositories, the Markdown renderer, the sync controller, the capability
//! registry and the contact intake. Both the CLI and the HTTP server start
//! from a [`Gateway`].

use std::sync::Arc;

use anyhow::Result;
use sqlx::SqlitePool;

use crate::capabilities::CapabilityRegistry;
use crate::config::Config;
use crate::contact::ContactIntake;
use crate::db;
use crate::migrate;
use crate::render::CommonMarkRenderer;
use crate::store::memory::InMemoryStore;
use crate::store::sqlite::SqliteStore;
use crate::store::{ContactRepository, DocumentRepository, TaxonomyRepository};
use crate::sync::{SyncController, SyncSettings};

/// The fully wired gateway. Cheap to clone.
#[derive(Clone)]
pub struct Gateway {
    pub config: Arc<Config>,
    pub controller: Arc<SyncController>,
    pub capabilities: Arc<CapabilityRegistry>,
    pub contact: Arc<ContactIntake>,
    pool: Option<SqlitePool>,
}

impl Gateway {
    /// Opens the database, ensures the schema exists, and wires everything
    /// against it. `capabilities` holds in-process capabilities; they take
    /// precedence over `[capabilities]` entries with the same name.
    pub async fn connect(config: &Config, capabilities: CapabilityRegistry) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply(&pool).await?;

        let store = Arc::new(SqliteStore::new(pool.clone(), config.docs.taxonomy.clone()));
        let mut gateway = Self::wire(config, capabilities, store)?;
        gateway.pool = Some(pool);
        Ok(gateway)
    }

    /// Wires everything against an [`InMemoryStore`]. Nothing touches
    /// `[db].path` and all state is lost on exit.
    pub fn ephemeral(config: &Config, capabilities: CapabilityRegistry) -> Result<Self> {
        Self::wire(config, capabilities, Arc::new(InMemoryStore::new()))
    }

    fn wire<S>(config: &Config, capabilities: CapabilityRegistry, store: Arc<S>) -> Result<Self>
    where
        S: DocumentRepository + TaxonomyRepository + ContactRepository + 'static,
    {
        let mut registry = CapabilityRegistry::from_config(config)?;
        for name in capabilities.names() {
            if let Some(capability) = capabilities.find(&name) {
                registry.register(capability);
            }
        }
        let capabilities = Arc::new(registry);

        let controller = Arc::new(SyncController::new(
            SyncSettings::from(&config.docs),
            Arc::new(CommonMarkRenderer),
            store.clone(),
            store.clone(),
        ));

        let contact = Arc::new(ContactIntake::new(
            config.contact.clone(),
            store,
            capabilities.clone(),
        ));

        Ok(Self {
            config: Arc::new(config.clone()),
            controller,
            capabilities,
            contact,
            pool: None,
        })
    }

    pub fn is_ephemeral(&self) -> bool {
        self.pool.is_none()
    }

    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
