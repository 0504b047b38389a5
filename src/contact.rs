//! Contact-form intake.
//!
//! Validates a submission, optionally checks the bot-verification token via
//! the `turnstile_verify` capability, stores it, and notifies through the
//! `send_email` capability when one is registered.

use std::sync::Arc;

use serde_json::json;
use tracing::{error, info, warn};

use crate::capabilities::{names, CapabilityRegistry};
use crate::config::ContactConfig;
use crate::error::SyncError;
use crate::models::{ContactReceipt, ContactSubmission};
use crate::store::ContactRepository;

pub struct ContactIntake {
    config: ContactConfig,
    store: Arc<dyn ContactRepository>,
    capabilities: Arc<CapabilityRegistry>,
}

impl ContactIntake {
    pub fn new(
        config: ContactConfig,
        store: Arc<dyn ContactRepository>,
        capabilities: Arc<CapabilityRegistry>,
    ) -> Self {
        Self {
            config,
            store,
            capabilities,
        }
    }

    pub async fn submit(&self, submission: ContactSubmission) -> Result<ContactReceipt, SyncError> {
        validate(&submission, self.config.max_message_len)?;

        if self.config.require_turnstile {
            self.verify(&submission).await?;
        }

        let id = self.store.save_contact(&submission).await?;
        info!(id, "contact submission stored");

        if self.config.notify && self.capabilities.contains(names::SEND_EMAIL) {
            let payload = json!({
                "subject": format!("Contact form: {}", submission.name),
                "reply_to": submission.email,
                "name": submission.name,
                "message": submission.message,
            });
            if let Err(e) = self.capabilities.invoke(names::SEND_EMAIL, payload).await {
                warn!(id, error = %e, "contact notification failed");
            }
        }

        Ok(ContactReceipt { success: true, id })
    }

    async fn verify(&self, submission: &ContactSubmission) -> Result<(), SyncError> {
        let token = submission
            .turnstile_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| SyncError::Validation("turnstile_token is required".to_string()))?;

        // Fails closed: without a verifier no submission can pass.
        if !self.capabilities.contains(names::TURNSTILE_VERIFY) {
            error!("require_turnstile is set but no turnstile_verify capability is registered");
            return Err(SyncError::Validation("verification_failed".to_string()));
        }

        let verdict = self
            .capabilities
            .invoke(names::TURNSTILE_VERIFY, json!({ "token": token }))
            .await?;

        if verdict.get("success").and_then(|v| v.as_bool()) != Some(true) {
            return Err(SyncError::Validation("verification_failed".to_string()));
        }
        Ok(())
    }
}

fn validate(submission: &ContactSubmission, max_message_len: usize) -> Result<(), SyncError> {
    if submission.name.trim().is_empty() {
        return Err(SyncError::Validation("name must not be empty".to_string()));
    }
    if !looks_like_email(submission.email.trim()) {
        return Err(SyncError::Validation("email is invalid".to_string()));
    }
    let message = submission.message.trim();
    if message.is_empty() {
        return Err(SyncError::Validation("message must not be empty".to_string()));
    }
    if message.chars().count() > max_message_len {
        return Err(SyncError::Validation(format!(
            "message must be at most {} characters",
            max_message_len
        )));
    }
    Ok(())
}

/// One `@`, a non-empty local part, and a dot inside the domain.
fn looks_like_email(email: &str) -> bool {
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !local.is_empty()
        && !email.contains(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::Capability;
    use crate::store::memory::InMemoryStore;
    use anyhow::Result;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Verifier {
        accept: bool,
    }

    #[async_trait]
    impl Capability for Verifier {
        fn name(&self) -> &str {
            names::TURNSTILE_VERIFY
        }

        async fn invoke(&self, params: Value) -> Result<Value> {
            assert_eq!(params["token"], "tok");
            Ok(json!({ "success": self.accept }))
        }
    }

    struct Mailer {
        sent: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Capability for Mailer {
        fn name(&self) -> &str {
            names::SEND_EMAIL
        }

        async fn invoke(&self, _params: Value) -> Result<Value> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(json!({ "queued": true }))
        }
    }

    fn submission() -> ContactSubmission {
        ContactSubmission {
            name: "Ada".to_string(),
            email: "ada@example.org".to_string(),
            message: "Loved the set last night.".to_string(),
            turnstile_token: Some("tok".to_string()),
        }
    }

    fn intake(
        config: ContactConfig,
        store: &Arc<InMemoryStore>,
        registry: CapabilityRegistry,
    ) -> ContactIntake {
        ContactIntake::new(config, store.clone(), Arc::new(registry))
    }

    #[test]
    fn test_email_shapes() {
        assert!(looks_like_email("ada@example.org"));
        assert!(!looks_like_email("ada@example"));
        assert!(!looks_like_email("@example.org"));
        assert!(!looks_like_email("a@b@example.org"));
        assert!(!looks_like_email("ada @example.org"));
        assert!(!looks_like_email("ada@.org"));
    }

    #[tokio::test]
    async fn test_accepts_and_notifies() {
        let store = Arc::new(InMemoryStore::new());
        let sent = Arc::new(AtomicUsize::new(0));
        let mut registry = CapabilityRegistry::new();
        registry.register(Arc::new(Mailer { sent: sent.clone() }));

        let receipt = intake(ContactConfig::default(), &store, registry)
            .submit(submission())
            .await
            .unwrap();
        assert!(receipt.success);
        assert_eq!(store.contacts().len(), 1);
        assert_eq!(sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejects_long_message() {
        let store = Arc::new(InMemoryStore::new());
        let config = ContactConfig {
            max_message_len: 5,
            ..ContactConfig::default()
        };
        let err = intake(config, &store, CapabilityRegistry::new())
            .submit(submission())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "bad_request");
        assert!(store.contacts().is_empty());
    }

    #[tokio::test]
    async fn test_turnstile_required_but_unregistered() {
        let store = Arc::new(InMemoryStore::new());
        let config = ContactConfig {
            require_turnstile: true,
            ..ContactConfig::default()
        };
        let err = intake(config, &store, CapabilityRegistry::new())
            .submit(submission())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "bad_request");
        assert_eq!(err.to_string(), "verification_failed");
        assert_eq!(store.contacts().len(), 0);
    }

    #[tokio::test]
    async fn test_turnstile_rejection() {
        let store = Arc::new(InMemoryStore::new());
        let config = ContactConfig {
            require_turnstile: true,
            ..ContactConfig::default()
        };
        let mut registry = CapabilityRegistry::new();
        registry.register(Arc::new(Verifier { accept: false }));

        let err = intake(config, &store, registry)
            .submit(submission())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "verification_failed");
        assert!(store.contacts().is_empty());
    }

    #[tokio::test]
    async fn test_turnstile_acceptance() {
        let store = Arc::new(InMemoryStore::new());
        let config = ContactConfig {
            require_turnstile: true,
            notify: false,
            ..ContactConfig::default()
        };
        let mut registry = CapabilityRegistry::new();
        registry.register(Arc::new(Verifier { accept: true }));

        let receipt = intake(config, &store, registry)
            .submit(submission())
            .await
            .unwrap();
        assert_eq!(receipt.id, 1);
    }
}
