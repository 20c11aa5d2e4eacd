//! Library definitions.
//!
//! Exports core modules, types, and the main proxy service implementation.

pub mod config;
pub mod core;

#[cfg(any(test, feature = "testing"))]
pub mod test_utils;
pub use config::{Config, PublicScheme, QueryPolicy, RelayError, Result};
pub use core::proxy::KeyProxy;
pub use core::rewrite::{RewriteContext, TargetResolver};
pub use core::stats::{RewriteStats, StatsSnapshot};
