//! Per-request rewrite context.

use super::encoding::encode_component;
use url::Url;

/// Everything needed to route a reference back through the proxy.
#[derive(Debug, Clone)]
pub struct RewriteContext {
    proxy_origin: String,
    key: String,
    target: Url,
}

impl RewriteContext {
    /// Builds a context from the scheme and `Host` the client used.
    #[must_use]
    pub fn new(proxy_scheme: &str, proxy_host: &str, key: &str, target: Url) -> Self {
        Self {
            proxy_origin: format!("{proxy_scheme}://{proxy_host}"),
            key: key.to_string(),
            target,
        }
    }

    /// The resolved target, used as base for relative references.
    #[must_use]
    pub const fn target(&self) -> &Url {
        &self.target
    }

    /// `/{key}/{encoded url}`.
    #[must_use]
    pub fn proxy_path(&self, absolute: &Url) -> String {
        format!("/{}/{}", self.key, encode_component(absolute.as_str()))
    }

    /// `{scheme}://{host}/{key}/{encoded url}`.
    #[must_use]
    pub fn proxy_url(&self, absolute: &Url) -> String {
        format!("{}{}", self.proxy_origin, self.proxy_path(absolute))
    }
}
