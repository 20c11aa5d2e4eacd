//! Target resolution.
//!
//! Splits `/{key}/{encoded target}` into its parts, checks the key and builds
//! the absolute URL the request is forwarded to.

use super::encoding::decode_component;
use crate::config::{Config, PublicScheme, QueryPolicy, RelayError, Result};
use url::Url;

/// A request that passed the key check and points at a valid absolute URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub key: String,
    pub url: Url,
}

/// Resolves inbound paths against the configured secret.
#[derive(Debug, Clone)]
pub struct TargetResolver {
    secret: String,
    scheme: PublicScheme,
    query_policy: QueryPolicy,
}

impl TargetResolver {
    #[must_use]
    pub fn new(secret: impl Into<String>, scheme: PublicScheme, query_policy: QueryPolicy) -> Self {
        Self {
            secret: secret.into(),
            scheme,
            query_policy,
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.secret_key.clone(),
            config.public_scheme,
            config.query_policy,
        )
    }

    /// Resolves an inbound path and query into a forwarding target.
    ///
    /// The key is checked before anything is decoded.
    ///
    /// # Errors
    ///
    /// - `MalformedRequest` if fewer than two non-empty segments are present,
    ///   the target does not decode to UTF-8, or the result is not an absolute
    ///   http(s) URL.
    /// - `Unauthorized` if the first segment is not the configured secret.
    pub fn resolve(&self, path: &str, query: Option<&str>) -> Result<ResolvedTarget> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let [key, rest @ ..] = segments.as_slice() else {
            return Err(RelayError::MalformedRequest("empty path".to_string()));
        };
        if rest.is_empty() {
            return Err(RelayError::MalformedRequest(
                "missing target segment".to_string(),
            ));
        }

        if *key != self.secret {
            return Err(RelayError::Unauthorized);
        }

        let decoded = decode_component(&rest.join("/"))?;
        let absolute = ensure_protocol(&decoded, self.scheme);
        let combined = apply_query(absolute, query, self.query_policy);

        let url = Url::parse(&combined)
            .map_err(|e| RelayError::MalformedRequest(format!("invalid target URL: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(RelayError::MalformedRequest(format!(
                "unsupported target scheme: {}",
                url.scheme()
            )));
        }

        Ok(ResolvedTarget {
            key: (*key).to_string(),
            url,
        })
    }
}

/// Prefixes a scheme when the decoded target does not carry one.
#[must_use]
pub fn ensure_protocol(raw: &str, scheme: PublicScheme) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else if trimmed.starts_with("//") {
        format!("{}:{trimmed}", scheme.as_str())
    } else {
        format!("{}://{trimmed}", scheme.as_str())
    }
}

fn apply_query(target: String, query: Option<&str>, policy: QueryPolicy) -> String {
    let Some(query) = query.filter(|q| !q.is_empty()) else {
        return target;
    };

    match policy {
        QueryPolicy::Append => format!("{target}?{query}"),
        QueryPolicy::Merge => {
            let (base, fragment) = target
                .split_once('#')
                .map_or((target.as_str(), None), |(b, f)| (b, Some(f)));
            let separator = if base.contains('?') { '&' } else { '?' };
            fragment.map_or_else(
                || format!("{base}{separator}{query}"),
                |f| format!("{base}{separator}{query}#{f}"),
            )
        }
        QueryPolicy::Ignore => target,
    }
}
