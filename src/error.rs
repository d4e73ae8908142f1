//! Error types
//!
//! The pipeline distinguishes four failure classes:
//! - [`ParseError`]: a single subscription line could not be decoded. The
//!   line is dropped and processing continues.
//! - [`EnvelopeError`]: the outer base64/UTF-8 envelope is malformed. The
//!   whole request fails.
//! - [`SourceError`]: an SNI source or the base subscription fetch failed.
//! - [`EmptyResultError`]: nothing usable was produced.

use thiserror::Error;

// ============================================================================
// Per-line Errors
// ============================================================================

/// Failure to decode a single link line
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing identity separator")]
    MissingIdentitySeparator,

    #[error("missing port separator")]
    MissingPortSeparator,

    #[error("missing identity token")]
    MissingIdentity,

    #[error("missing host")]
    MissingHost,

    #[error("invalid port: {0:?}")]
    InvalidPort(String),

    #[error("invalid JSON link: {0}")]
    Json(String),
}

// ============================================================================
// Envelope Errors
// ============================================================================

/// Failure to decode the outer subscription envelope
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("subscription is not valid base64")]
    Base64,

    #[error("decoded subscription is not valid UTF-8")]
    Utf8,
}

// ============================================================================
// Source Errors
// ============================================================================

/// Failure reported by an SNI source or the base subscription fetch
#[derive(Error, Debug)]
pub enum SourceError {
    /// No record matches the subscription identifier
    #[error("no SNI record found for {0}")]
    NotFound(String),

    /// A record was found but it lists no domains
    #[error("SNI list for {0} is empty")]
    Empty(String),

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SourceError {
    /// Whether the source simply had nothing to offer, as opposed to failing
    pub fn is_unavailable(&self) -> bool {
        matches!(self, SourceError::NotFound(_) | SourceError::Empty(_))
    }
}

impl From<rusqlite::Error> for SourceError {
    fn from(e: rusqlite::Error) -> Self {
        SourceError::Database(e.to_string())
    }
}

// ============================================================================
// Empty Results
// ============================================================================

/// Recoverable "nothing to return" conditions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmptyResultError {
    #[error("No valid configurations found in base subscription")]
    NoBaseConfigs,

    #[error("No SNI candidates available for this subscription")]
    NoSniCandidates,

    #[error("No configurations generated")]
    NoOutput,
}

// ============================================================================
// Pipeline Error
// ============================================================================

/// Anything that can end a subscription request
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Empty(#[from] EmptyResultError),
}

impl GenerateError {
    /// Plain-text message handed to the subscription client
    pub fn to_client_message(&self) -> String {
        format!("Error: {}", self)
    }
}
