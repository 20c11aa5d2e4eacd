//! Test utilities and shared configuration.
//!
//! This module provides common helpers for unit and integration tests,
//! reducing duplication across the codebase.

#[cfg(any(test, feature = "testing"))]
use crate::config::{Config, PublicScheme, QueryPolicy};
#[cfg(any(test, feature = "testing"))]
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
#[cfg(any(test, feature = "testing"))]
use std::sync::Arc;

/// Key used by [`create_test_config`].
#[cfg(any(test, feature = "testing"))]
pub const TEST_KEY: &str = "abc123";

/// Creates a standard configuration for testing purposes.
///
/// This configuration has:
/// - Port 8080 on all interfaces
/// - Key `abc123`
/// - `http` public scheme and the `append` query policy
#[cfg(any(test, feature = "testing"))]
#[must_use]
pub fn create_test_config() -> Arc<Config> {
    Arc::new(Config {
        listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080),
        secret_key: TEST_KEY.to_string(),
        public_scheme: PublicScheme::Http,
        query_policy: QueryPolicy::Append,
        placeholder_text: "Under maintenance...".to_string(),
        verify_upstream_tls: true,
        log_format: "pretty".to_string(),
    })
}
