//! Configuration settings.
//!
//! Defines the main `Config` struct and environment variable loading logic.

use super::error::{RelayError, Result};
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

/// Key used when `SECRET_KEY` is not provided and strict mode is off.
pub const DEFAULT_SECRET_KEY: &str = "default_key";

/// Body of the placeholder page served on `/`.
pub const DEFAULT_PLACEHOLDER_TEXT: &str = "Under maintenance...";

/// Scheme clients use to reach the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicScheme {
    Http,
    Https,
}

impl FromStr for PublicScheme {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().trim_end_matches(':').to_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            _ => Err(RelayError::Config(format!(
                "PUBLIC_SCHEME '{s}' must be http or https"
            ))),
        }
    }
}

impl PublicScheme {
    /// Scheme name without the trailing colon.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

/// How the inbound query string is combined with the decoded target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPolicy {
    /// Append `?{query}` verbatim, even if the target already has a query.
    Append,
    /// Join with `&` when the target already has a query.
    Merge,
    /// Drop the inbound query string.
    Ignore,
}

impl FromStr for QueryPolicy {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "append" => Ok(Self::Append),
            "merge" => Ok(Self::Merge),
            "ignore" => Ok(Self::Ignore),
            _ => Err(RelayError::Config(format!(
                "QUERY_POLICY '{s}' must be append, merge or ignore"
            ))),
        }
    }
}

fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_env_bool(key: &str) -> bool {
    env::var(key)
        .map(|v| v.to_lowercase() == "true" || v == "1")
        .unwrap_or(false)
}

fn get_env_bool_or(key: &str, default: bool) -> bool {
    env::var(key).map_or(default, |v| v.to_lowercase() == "true" || v == "1")
}

/// Application configuration loaded from environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the proxy listens on.
    pub listen_addr: SocketAddr,
    /// Shared secret expected as the first path segment.
    pub secret_key: String,
    /// Scheme used for protocol defaulting and rewritten HTML links.
    pub public_scheme: PublicScheme,
    /// Inbound query string handling.
    pub query_policy: QueryPolicy,
    /// Body served on `/`.
    pub placeholder_text: String,
    /// Verify upstream TLS certificates.
    pub verify_upstream_tls: bool,
    /// Logging format: "json" or "pretty".
    pub log_format: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Config` when:
    /// - `LISTEN_ADDR` is not a valid socket address
    /// - `PUBLIC_SCHEME` is neither `http` nor `https`
    /// - `QUERY_POLICY` is not one of `append`, `merge`, `ignore`
    /// - `STRICT_CONFIG` is enabled and `SECRET_KEY` is unset or empty
    pub fn from_env() -> Result<Arc<Self>> {
        let listen_raw = get_env_or("LISTEN_ADDR", "0.0.0.0:8080");
        let listen_addr = listen_raw.parse().map_err(|e| {
            RelayError::Config(format!("LISTEN_ADDR '{listen_raw}' is invalid: {e}"))
        })?;

        let secret_key = Self::load_secret(get_env_bool("STRICT_CONFIG"))?;

        let public_scheme: PublicScheme = get_env_or("PUBLIC_SCHEME", "http").parse()?;
        let query_policy: QueryPolicy = get_env_or("QUERY_POLICY", "append").parse()?;

        Ok(Arc::new(Self {
            listen_addr,
            secret_key,
            public_scheme,
            query_policy,
            placeholder_text: get_env_or("PLACEHOLDER_TEXT", DEFAULT_PLACEHOLDER_TEXT),
            verify_upstream_tls: get_env_bool_or("UPSTREAM_VERIFY_TLS", true),
            log_format: get_env_or("LOG_FORMAT", "json"),
        }))
    }

    fn load_secret(strict: bool) -> Result<String> {
        match env::var("SECRET_KEY") {
            Ok(key) if !key.is_empty() => Ok(key),
            _ if strict => Err(RelayError::Config(
                "SECRET_KEY must be set when STRICT_CONFIG is enabled".to_string(),
            )),
            _ => {
                tracing::warn!(
                    "SECRET_KEY not set, falling back to the well-known default key"
                );
                Ok(DEFAULT_SECRET_KEY.to_string())
            }
        }
    }
}
