//! Redirect `Location` rewriting.

use super::context::RewriteContext;
use crate::config::{RelayError, Result};

/// Statuses whose `Location` header is routed back through the proxy.
pub const REDIRECT_STATUSES: [u16; 5] = [301, 302, 303, 307, 308];

#[must_use]
pub fn is_redirect(status: u16) -> bool {
    REDIRECT_STATUSES.contains(&status)
}

/// Resolves `location` against the target and returns `/{key}/{encoded}`.
///
/// # Errors
///
/// Returns `RelayError::RewriteSkipped` when the location cannot be resolved;
/// the caller keeps the original header.
pub fn rewrite_location(location: &str, ctx: &RewriteContext) -> Result<String> {
    let absolute = ctx
        .target()
        .join(location)
        .map_err(|e| RelayError::RewriteSkipped {
            value: location.to_string(),
            reason: e.to_string(),
        })?;
    Ok(ctx.proxy_path(&absolute))
}
