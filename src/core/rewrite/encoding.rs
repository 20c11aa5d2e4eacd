//! URI component encoding.
//!
//! Targets travel inside a single path segment, so everything outside the
//! unreserved component set is escaped, `/` and `:` included.

use crate::config::{RelayError, Result};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encodes a string as a single URI component.
#[must_use]
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// Percent-decodes a URI component. `+` is kept literally.
///
/// # Errors
///
/// Returns `RelayError::MalformedRequest` if a `%` is not followed by two hex
/// digits or the decoded bytes are not UTF-8.
pub fn decode_component(value: &str) -> Result<String> {
    if let Some(pos) = find_malformed_escape(value) {
        return Err(RelayError::MalformedRequest(format!(
            "malformed percent escape at byte {pos}"
        )));
    }

    percent_decode_str(value)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| RelayError::MalformedRequest(format!("target is not valid UTF-8: {e}")))
}

fn find_malformed_escape(value: &str) -> Option<usize> {
    let bytes = value.as_bytes();
    bytes.iter().enumerate().find_map(|(i, &b)| {
        let valid = b != b'%'
            || matches!(
                (bytes.get(i + 1), bytes.get(i + 2)),
                (Some(hi), Some(lo)) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit()
            );
        (!valid).then_some(i)
    })
}
