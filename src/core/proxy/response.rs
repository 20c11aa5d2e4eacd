//! HTTP response utilities.
//!
//! Responses the proxy answers itself: the placeholder page and error pages.

use crate::config::RelayError;
use pingora::Result;
use pingora::http::ResponseHeader;
use pingora::proxy::Session;

/// Serves a plaintext response.
///
/// # Errors
///
/// Returns an error if headers cannot be built or response cannot be written.
pub async fn serve_text(
    session: &mut Session,
    status: u16,
    content_type: &str,
    body: &str,
) -> Result<bool> {
    let mut header = ResponseHeader::build(status, None)?;
    header.insert_header("Content-Type", content_type)?;
    header.insert_header("Content-Length", body.len().to_string())?;

    session
        .write_response_header(Box::new(header), false)
        .await?;
    session
        .write_response_body(Some(bytes::Bytes::from(body.to_string())), true)
        .await?;
    Ok(true)
}

/// Serves the fixed public message for `err` with its status code.
///
/// # Errors
///
/// Returns an error if the response cannot be written.
pub async fn serve_error(session: &mut Session, err: &RelayError) -> Result<bool> {
    serve_text(session, err.status_code(), "text/plain", err.public_message()).await
}
