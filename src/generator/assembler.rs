//! Subscription envelope
//!
//! A subscription body is a Base64 blob wrapping newline-separated links.

use tracing::debug;

use crate::error::EnvelopeError;
use crate::parser::base64::{decode_base64, encode_base64};

/// Unwraps an envelope into its non-blank, trimmed lines
pub fn decode_envelope(text: &str) -> Result<Vec<String>, EnvelopeError> {
    let decoded = decode_base64(text.trim())?;
    let content = String::from_utf8(decoded).map_err(|_| EnvelopeError::Utf8)?;

    let lines: Vec<String> = content
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    debug!("Envelope holds {} line(s)", lines.len());
    Ok(lines)
}

/// Joins lines with `\n` and wraps them in standard Base64
pub fn encode_envelope<S: AsRef<str>>(lines: &[S]) -> String {
    let joined = lines
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<&str>>()
        .join("\n");
    encode_base64(joined.as_bytes())
}
