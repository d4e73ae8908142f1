//! Generator utility functions
//!
//! Path expansion and HTTP fetching shared by the generator and the SNI
//! sources.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::debug;

use crate::error::SourceError;
use crate::get_version;

// ============================================================================
// Path Utilities
// ============================================================================

/// Expand ~ to home directory in path
pub fn expand_tilde(path: &str) -> String {
    if (path.starts_with("~/") || path == "~")
        && let Some(home) = dirs_home()
    {
        return path.replacen("~", &home, 1);
    }
    path.to_string()
}

/// Get home directory path
pub fn dirs_home() -> Option<String> {
    #[cfg(windows)]
    {
        std::env::var("USERPROFILE").ok()
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOME").ok()
    }
}

// ============================================================================
// HTTP Utilities
// ============================================================================

/// Build the HTTP client used for every outgoing request
pub fn build_http_client(timeout: Duration, accept_invalid_certs: bool) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(format!("sni-fanout/{}", get_version()))
        .timeout(timeout)
        .connect_timeout(timeout)
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()
        .context("Failed to build HTTP client")
}

/// Fetch text content from a URL
pub async fn fetch_text(client: &reqwest::Client, url: &str) -> Result<String, SourceError> {
    debug!("Fetching URL: {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| SourceError::Fetch(format!("{}: {}", url, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Fetch(format!(
            "HTTP request failed with status {}: {}",
            status, url
        )));
    }

    let text = response
        .text()
        .await
        .map_err(|e| SourceError::Fetch(format!("Failed to read response body from {}: {}", url, e)))?;

    debug!("Fetched {} bytes from {}", text.len(), url);
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_expand_tilde_with_home() {
        if let Ok(home) = env::var("HOME") {
            let expanded = expand_tilde("~/test/path");
            assert!(expanded.starts_with(&home));
            assert!(expanded.ends_with("/test/path"));
            assert!(!expanded.contains('~'));
        }
    }

    #[test]
    fn test_expand_tilde_no_tilde() {
        let path = "/absolute/path/to/file";
        assert_eq!(expand_tilde(path), path);
    }

    #[test]
    fn test_expand_tilde_tilde_in_middle() {
        let path = "/some/~/path";
        assert_eq!(expand_tilde(path), path);
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(Duration::from_secs(5), false).is_ok());
        assert!(build_http_client(Duration::from_secs(5), true).is_ok());
    }

    #[tokio::test]
    async fn test_fetch_text_unreachable() {
        let client = build_http_client(Duration::from_secs(1), false).unwrap();
        // Port 9 (discard) on loopback is closed in test environments
        let result = fetch_text(&client, "http://127.0.0.1:9/sub/x").await;
        assert!(matches!(result, Err(SourceError::Fetch(_))));
    }
}
