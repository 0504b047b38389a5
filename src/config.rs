//! TOML configuration for the gateway.
//!
//! One file describes the database, the listen address, the tenant sites,
//! the documentation sync target, the optional OAuth client, contact-form
//! policy, and the HTTP-forwarded capabilities.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub sites: Vec<SiteConfig>,
    pub docs: DocsConfig,
    #[serde(default)]
    pub oauth: Option<OAuthConfig>,
    #[serde(default)]
    pub contact: ContactConfig,
    #[serde(default)]
    pub capabilities: BTreeMap<String, CapabilityConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    /// Site assumed for requests that carry no `X-Site-Id` header.
    #[serde(default)]
    pub default_site: Option<i64>,
}

/// One tenant of the network and the content types it has registered.
#[derive(Debug, Deserialize, Clone)]
pub struct SiteConfig {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub post_types: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocsConfig {
    /// The designated documentation tenant. Syncs from any other site are rejected.
    pub site_id: i64,
    #[serde(default = "default_post_type")]
    pub post_type: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default = "default_taxonomy")]
    pub taxonomy: String,
    #[serde(default = "default_association_attempts")]
    pub association_attempts: u32,
    #[serde(default = "default_association_backoff_ms")]
    pub association_backoff_ms: u64,
}

fn default_post_type() -> String {
    "documentation".to_string()
}
fn default_status() -> String {
    "publish".to_string()
}
fn default_taxonomy() -> String {
    "platform".to_string()
}
fn default_association_attempts() -> u32 {
    3
}
fn default_association_backoff_ms() -> u64 {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub authorize_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Never exposed over HTTP.
    #[serde(default)]
    #[allow(dead_code)]
    pub client_secret: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContactConfig {
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
    #[serde(default)]
    pub require_turnstile: bool,
    #[serde(default = "default_notify")]
    pub notify: bool,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            max_message_len: default_max_message_len(),
            require_turnstile: false,
            notify: true,
        }
    }
}

fn default_max_message_len() -> usize {
    5000
}
fn default_notify() -> bool {
    true
}

/// A capability served by an upstream HTTP endpoint.
#[derive(Debug, Deserialize, Clone)]
pub struct CapabilityConfig {
    pub url: String,
    #[serde(default = "default_capability_timeout")]
    pub timeout_secs: u64,
}

fn default_capability_timeout() -> u64 {
    10
}

impl Config {
    /// Looks up a configured site by id.
    pub fn site(&self, id: i64) -> Option<&SiteConfig> {
        self.sites.iter().find(|s| s.id == id)
    }
}

/// Parses TOML text and validates it.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

fn validate(config: &Config) -> Result<()> {
    if config.site(config.docs.site_id).is_none() {
        anyhow::bail!(
            "docs.site_id = {} does not name a configured [[sites]] entry",
            config.docs.site_id
        );
    }

    if config.docs.association_attempts == 0 {
        anyhow::bail!("docs.association_attempts must be >= 1");
    }

    if config.contact.max_message_len == 0 {
        anyhow::bail!("contact.max_message_len must be > 0");
    }

    if let Some(site) = config.server.default_site {
        if config.site(site).is_none() {
            anyhow::bail!("server.default_site = {} is not a configured site", site);
        }
    }

    for (name, cap) in &config.capabilities {
        if !(cap.url.starts_with("http://") || cap.url.starts_with("https://")) {
            anyhow::bail!(
                "capabilities.{}.url must be an http(s) URL, got '{}'",
                name,
                cap.url
            );
        }
    }

    Ok(())
}
