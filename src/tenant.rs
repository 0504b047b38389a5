//! Tenant (site) context of an incoming call.

use crate::config::Config;

/// The environment a sync runs in: which site the caller is on and what
/// content types that site has registered.
pub trait TenantContext: Send + Sync {
    /// Identifier of the current site, if one could be resolved.
    fn current_site(&self) -> Option<i64>;

    fn current_tenant_matches(&self, designated: i64) -> bool {
        self.current_site() == Some(designated)
    }

    fn post_type_registered(&self, post_type: &str) -> bool;
}

/// Site context resolved from configuration for one request.
#[derive(Debug, Clone)]
pub struct SiteContext {
    site_id: Option<i64>,
    post_types: Vec<String>,
}

impl SiteContext {
    /// Resolves `site_id` (falling back to `server.default_site`) against
    /// the configured sites. An unknown site yields a context with no
    /// registered post types.
    pub fn resolve(config: &Config, site_id: Option<i64>) -> Self {
        let site_id = site_id.or(config.server.default_site);
        let post_types = site_id
            .and_then(|id| config.site(id))
            .map(|site| site.post_types.clone())
            .unwrap_or_default();
        Self {
            site_id,
            post_types,
        }
    }

    /// Context for a caller whose site could not be identified.
    pub fn unknown() -> Self {
        Self {
            site_id: None,
            post_types: Vec::new(),
        }
    }

    /// Context for the designated documentation site, used by the CLI.
    pub fn docs_site(config: &Config) -> Self {
        Self::resolve(config, Some(config.docs.site_id))
    }
}

impl TenantContext for SiteContext {
    fn current_site(&self) -> Option<i64> {
        self.site_id
    }

    fn post_type_registered(&self, post_type: &str) -> bool {
        self.post_types.iter().any(|p| p == post_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    fn config() -> Config {
        parse_config(
            r#"
[db]
path = "/tmp/gateway.sqlite"

[server]
bind = "127.0.0.1:0"
default_site = 1

[[sites]]
id = 1
name = "main"
post_types = ["post", "page"]

[[sites]]
id = 2
name = "docs"
post_types = ["documentation"]

[docs]
site_id = 2
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_header_site_wins_over_default() {
        let ctx = SiteContext::resolve(&config(), Some(2));
        assert!(ctx.current_tenant_matches(2));
        assert!(ctx.post_type_registered("documentation"));
    }

    #[test]
    fn test_default_site_used_when_absent() {
        let ctx = SiteContext::resolve(&config(), None);
        assert_eq!(ctx.current_site(), Some(1));
        assert!(!ctx.current_tenant_matches(2));
        assert!(!ctx.post_type_registered("documentation"));
    }

    #[test]
    fn test_unknown_site_has_no_types() {
        let ctx = SiteContext::resolve(&config(), Some(77));
        assert!(!ctx.post_type_registered("post"));
    }

    #[test]
    fn test_unknown_matches_nothing() {
        let ctx = SiteContext::unknown();
        assert!(!ctx.current_tenant_matches(2));
        assert_eq!(ctx.current_site(), None);
    }

    #[test]
    fn test_docs_site() {
        let ctx = SiteContext::docs_site(&config());
        assert!(ctx.current_tenant_matches(2));
    }
}
