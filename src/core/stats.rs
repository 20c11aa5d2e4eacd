//! Rewrite and forwarding counters.
//!
//! Lock-free counters shared by every request task; fail-open rewrites are
//! only visible through these and the debug log.

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide proxy counters.
#[derive(Debug, Default)]
pub struct RewriteStats {
    proxied: AtomicU64,
    rejected: AtomicU64,
    upstream_failures: AtomicU64,
    redirects_rewritten: AtomicU64,
    links_rewritten: AtomicU64,
    rewrites_skipped: AtomicU64,
}

/// Point-in-time copy of [`RewriteStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub proxied: u64,
    pub rejected: u64,
    pub upstream_failures: u64,
    pub redirects_rewritten: u64,
    pub links_rewritten: u64,
    pub rewrites_skipped: u64,
}

impl RewriteStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_proxied(&self) {
        self.proxied.fetch_add(1, Ordering::Relaxed);
    }

    /// Request refused with 400 or 403 before reaching the upstream.
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upstream_failure(&self) {
        self.upstream_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_redirect(&self) {
        self.redirects_rewritten.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_links(&self, rewritten: u64) {
        self.links_rewritten.fetch_add(rewritten, Ordering::Relaxed);
    }

    pub fn record_skipped(&self, count: u64) {
        self.rewrites_skipped.fetch_add(count, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            proxied: self.proxied.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            upstream_failures: self.upstream_failures.load(Ordering::Relaxed),
            redirects_rewritten: self.redirects_rewritten.load(Ordering::Relaxed),
            links_rewritten: self.links_rewritten.load(Ordering::Relaxed),
            rewrites_skipped: self.rewrites_skipped.load(Ordering::Relaxed),
        }
    }
}
