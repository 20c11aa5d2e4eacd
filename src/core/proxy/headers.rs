//! Header policy.
//!
//! Strips edge and hop identifying headers on the way in and enforces the
//! no-cache and CORS policy on the way out.

use pingora::Result;
use pingora::http::{RequestHeader, ResponseHeader};

/// Overwritten on every proxied response.
pub const NO_CACHE_HEADERS: [(&str, &str); 3] = [
    ("Cache-Control", "no-cache, no-store, must-revalidate"),
    ("Pragma", "no-cache"),
    ("Expires", "0"),
];

/// Overwritten on every proxied response.
pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS"),
    ("Access-Control-Allow-Headers", "*"),
];

/// Whether an inbound header may be sent to the target.
#[must_use]
pub fn is_forwardable(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    !(name.starts_with("cf-") || name.starts_with("x-forwarded-") || name == "host")
}

/// Removes `cf-*`, `x-forwarded-*` and `host`. Returns how many names were dropped.
pub fn strip_inbound_headers(request: &mut RequestHeader) -> usize {
    let blocked: Vec<String> = request
        .headers
        .keys()
        .map(|name| name.as_str().to_string())
        .filter(|name| !is_forwardable(name))
        .collect();

    for name in &blocked {
        request.remove_header(name.as_str());
    }
    blocked.len()
}

/// Asks the target for an unencoded body.
///
/// Pingora only decodes upstream bodies in encodings the outbound request did
/// not advertise, so the client's `Accept-Encoding` is replaced. A target that
/// compresses anyway still gets its gzip or brotli body decoded.
///
/// # Errors
///
/// Returns an error if header insertion fails.
pub fn request_identity_encoding(request: &mut RequestHeader) -> Result<()> {
    request.insert_header("Accept-Encoding", "identity")
}

/// Whether the body is still encoded after pingora's decompression pass.
///
/// Pingora drops `Content-Encoding` for the codings it decodes; anything left
/// (deflate, zstd, unknown) reaches the body filter as raw bytes.
#[must_use]
pub fn has_content_encoding(response: &ResponseHeader) -> bool {
    response
        .headers
        .get("Content-Encoding")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| {
            let v = v.trim();
            !v.is_empty() && !v.eq_ignore_ascii_case("identity")
        })
}

/// Applies the no-cache and permissive CORS headers, replacing upstream values.
///
/// # Errors
///
/// Returns an error if header insertion fails.
pub fn apply_response_policy(response: &mut ResponseHeader) -> Result<()> {
    for (name, value) in NO_CACHE_HEADERS.into_iter().chain(CORS_HEADERS) {
        response.insert_header(name, value)?;
    }
    Ok(())
}
