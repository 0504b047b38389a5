//! Public OAuth client configuration.
//!
//! Front-ends fetch this to start an authorization-code flow. Only the
//! public half of the client registration is exposed.

use serde::Serialize;

use crate::config::OAuthConfig;
use crate::error::SyncError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicOAuthConfig {
    pub client_id: String,
    pub authorize_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl From<&OAuthConfig> for PublicOAuthConfig {
    fn from(config: &OAuthConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            authorize_url: config.authorize_url.clone(),
            token_url: config.token_url.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scopes: config.scopes.clone(),
        }
    }
}

/// `CapabilityUnavailable("oauth")` when no `[oauth]` table is configured.
pub fn public_config(config: Option<&OAuthConfig>) -> Result<PublicOAuthConfig, SyncError> {
    config
        .map(PublicOAuthConfig::from)
        .ok_or_else(|| SyncError::CapabilityUnavailable("oauth".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_never_serialized() {
        let config = OAuthConfig {
            client_id: "gateway-web".to_string(),
            authorize_url: "https://auth.example.org/authorize".to_string(),
            token_url: "https://auth.example.org/token".to_string(),
            redirect_uri: "https://docs.example.org/callback".to_string(),
            scopes: vec!["openid".to_string(), "profile".to_string()],
            client_secret: Some("s3cr3t".to_string()),
        };
        let public = public_config(Some(&config)).unwrap();
        let json = serde_json::to_string(&public).unwrap();
        assert!(json.contains("gateway-web"));
        assert!(!json.contains("s3cr3t"));
        assert!(!json.contains("client_secret"));
    }

    #[test]
    fn test_missing_config_unavailable() {
        let err = public_config(None).unwrap_err();
        assert_eq!(err.code(), "capability_unavailable");
    }
}
