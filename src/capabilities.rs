//! Explicit capability registry for delegated business logic.
//!
//! Several routes only forward to logic owned by sibling systems (name
//! generators, chat, stream status, bot verification, email, newsletter
//! sync). Each such piece of logic is a [`Capability`] registered by name
//! at startup. A route asks the [`CapabilityRegistry`] for its capability
//! and gets a typed [`SyncError::CapabilityUnavailable`] if nothing was
//! wired in.
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │           CapabilityRegistry           │
//! │  ┌────────────────┐ ┌───────────────┐  │
//! │  │ HttpCapability │ │  in-process   │  │
//! │  │ [capabilities] │ │  (embedder)   │  │
//! │  └────────────────┘ └───────────────┘  │
//! └───────────────────┬────────────────────┘
//!                     ▼
//!          server routes / contact intake
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::config::{CapabilityConfig, Config};
use crate::error::SyncError;

/// Well-known capability names used by the built-in routes.
pub mod names {
    pub const BAND_NAME: &str = "band_name";
    pub const RAPPER_NAME: &str = "rapper_name";
    pub const CHAT: &str = "chat";
    pub const STREAM_STATUS: &str = "stream_status";
    pub const NEWSLETTER_SYNC: &str = "newsletter_sync";
    pub const TURNSTILE_VERIFY: &str = "turnstile_verify";
    pub const SEND_EMAIL: &str = "send_email";
}

/// A unit of delegated business logic.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use anyhow::Result;
/// use serde_json::{json, Value};
/// use content_gateway::capabilities::Capability;
///
/// pub struct StaticStreamStatus;
///
/// #[async_trait]
/// impl Capability for StaticStreamStatus {
///     fn name(&self) -> &str { "stream_status" }
///
///     async fn invoke(&self, _params: Value) -> Result<Value> {
///         Ok(json!({ "live": false }))
///     }
/// }
/// ```
#[async_trait]
pub trait Capability: Send + Sync {
    /// Registry key, e.g. `"band_name"`.
    fn name(&self) -> &str;

    /// Runs the capability with the request's JSON parameters.
    async fn invoke(&self, params: Value) -> Result<Value>;
}

/// Forwards invocations as `POST <url>` with a JSON body.
pub struct HttpCapability {
    name: String,
    url: String,
    client: reqwest::Client,
}

impl HttpCapability {
    pub fn new(name: impl Into<String>, config: &CapabilityConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            name: name.into(),
            url: config.url.clone(),
            client,
        })
    }
}

#[async_trait]
impl Capability for HttpCapability {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, params: Value) -> Result<Value> {
        let response = self.client.post(&self.url).json(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("upstream returned {}: {}", status, body);
        }
        Ok(response.json().await?)
    }
}

/// Capabilities available to the running process, keyed by name.
#[derive(Clone, Default)]
pub struct CapabilityRegistry {
    capabilities: BTreeMap<String, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an [`HttpCapability`] for every `[capabilities.<name>]` table.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut registry = Self::new();
        for (name, cfg) in &config.capabilities {
            registry.register(Arc::new(HttpCapability::new(name.clone(), cfg)?));
        }
        Ok(registry)
    }

    /// Registers a capability, replacing any previous one with the same name.
    pub fn register(&mut self, capability: Arc<dyn Capability>) {
        self.capabilities
            .insert(capability.name().to_string(), capability);
    }

    pub fn find(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.capabilities.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }

    /// Resolves `name`, failing with `CapabilityUnavailable` when absent.
    pub fn require(&self, name: &str) -> Result<Arc<dyn Capability>, SyncError> {
        self.find(name)
            .ok_or_else(|| SyncError::CapabilityUnavailable(name.to_string()))
    }

    /// Resolves and invokes `name`.
    pub async fn invoke(&self, name: &str, params: Value) -> Result<Value, SyncError> {
        let capability = self.require(name)?;
        debug!(capability = name, "invoking capability");
        capability
            .invoke(params)
            .await
            .map_err(|e| SyncError::Capability {
                name: name.to_string(),
                message: e.to_string(),
            })
    }

    pub fn names(&self) -> Vec<String> {
        self.capabilities.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl Capability for Echo {
        fn name(&self) -> &str {
            "chat"
        }

        async fn invoke(&self, params: Value) -> Result<Value> {
            Ok(json!({ "echo": params }))
        }
    }

    struct Broken;

    #[async_trait]
    impl Capability for Broken {
        fn name(&self) -> &str {
            "band_name"
        }

        async fn invoke(&self, _params: Value) -> Result<Value> {
            bail!("generator exhausted")
        }
    }

    #[tokio::test]
    async fn test_missing_capability_is_typed() {
        let registry = CapabilityRegistry::new();
        let err = registry.invoke(names::CHAT, json!({})).await.unwrap_err();
        assert!(matches!(err, SyncError::CapabilityUnavailable(ref n) if n == "chat"));
        assert_eq!(err.code(), "capability_unavailable");
    }

    #[tokio::test]
    async fn test_registered_capability_invoked() {
        let mut registry = CapabilityRegistry::new();
        registry.register(Arc::new(Echo));
        assert!(registry.contains("chat"));
        let out = registry
            .invoke("chat", json!({ "message": "hi" }))
            .await
            .unwrap();
        assert_eq!(out, json!({ "echo": { "message": "hi" } }));
    }

    #[tokio::test]
    async fn test_failure_wrapped() {
        let mut registry = CapabilityRegistry::new();
        registry.register(Arc::new(Broken));
        let err = registry.invoke("band_name", json!({})).await.unwrap_err();
        assert_eq!(err.code(), "capability_error");
        assert!(err.to_string().contains("generator exhausted"));
    }

    #[test]
    fn test_names_sorted() {
        let mut registry = CapabilityRegistry::new();
        registry.register(Arc::new(Echo));
        registry.register(Arc::new(Broken));
        assert_eq!(registry.names(), vec!["band_name", "chat"]);
        assert_eq!(registry.len(), 2);
    }
}
