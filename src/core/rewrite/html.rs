//! HTML link rewriting.
//!
//! Best-effort, regex based. Only `href`, `src` and `action` attributes are
//! touched; `srcset`, CSS `url()`, inline scripts and meta refresh are not.

use super::context::RewriteContext;
use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::debug;

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(href|src|action)=["']([^"']+)["']"#).expect("valid attribute regex")
});

/// Result of rewriting one HTML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlRewrite {
    pub body: String,
    pub rewritten: u64,
    pub skipped: u64,
}

/// Substring match on the `Content-Type` value.
#[must_use]
pub fn is_html(content_type: &str) -> bool {
    content_type.contains("text/html")
}

fn is_passthrough(value: &str) -> bool {
    value.is_empty()
        || value.starts_with('#')
        || value.contains("://")
        || value.starts_with("javascript:")
}

/// Rewrites relative attribute values so they route back through the proxy.
///
/// Values that fail to resolve are left as they were and counted in
/// `skipped`.
#[must_use]
pub fn rewrite_html(text: &str, ctx: &RewriteContext) -> HtmlRewrite {
    let mut rewritten = 0;
    let mut skipped = 0;

    let body = ATTR_RE.replace_all(text, |caps: &Captures| {
        let original = caps[0].to_string();
        let attr = &caps[1];
        let value = &caps[2];

        if is_passthrough(value) {
            return original;
        }

        match ctx.target().join(value) {
            Ok(absolute) => {
                rewritten += 1;
                format!("{attr}=\"{}\"", ctx.proxy_url(&absolute))
            }
            Err(e) => {
                skipped += 1;
                debug!(value = %value, error = %e, action = "SKIP", "HTML link left unmodified");
                original
            }
        }
    });

    HtmlRewrite {
        body: body.into_owned(),
        rewritten,
        skipped,
    }
}
