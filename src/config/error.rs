//! Error types and result aliases.
//!
//! Defines the core `RelayError` enumeration and common `Result` type.

use thiserror::Error;

/// Proxy-specific errors.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration error, raised at startup only.
    #[error("configuration error: {0}")]
    Config(String),

    /// The inbound path does not have the `/{key}/{target}` shape.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// The key segment does not match the configured secret.
    #[error("access key mismatch")]
    Unauthorized,

    /// The target could not be reached or answered with garbage.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// A single URL inside a redirect or HTML body could not be rewritten.
    ///
    /// Never surfaces as a response; the value is passed through untouched.
    #[error("rewrite skipped for {value:?}: {reason}")]
    RewriteSkipped { value: String, reason: String },
}

impl RelayError {
    /// HTTP status sent to the client for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::MalformedRequest(_) => 400,
            Self::Unauthorized => 403,
            Self::Config(_) | Self::UpstreamUnavailable(_) | Self::RewriteSkipped { .. } => 503,
        }
    }

    /// Body sent to the client. Never carries internal detail.
    #[must_use]
    pub const fn public_message(&self) -> &'static str {
        match self {
            Self::MalformedRequest(_) => "Invalid request format",
            Self::Unauthorized => "Access denied",
            Self::Config(_) | Self::UpstreamUnavailable(_) | Self::RewriteSkipped { .. } => {
                "Service unavailable"
            }
        }
    }
}

/// Result type alias for `RelayError`.
pub type Result<T> = std::result::Result<T, RelayError>;
