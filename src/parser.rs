//! Subscription line parsing
//!
//! This module provides:
//! - The structured link record ([`ProxyLink`]) and its [`Profile`] classifier
//! - Decoding of `vless://` URIs and JSON object lines
//! - Encoding of records back into `vless://` URIs
//! - Lossy batch parsing, where a bad line is logged and skipped

pub mod base64;
pub mod json;
pub mod link;
pub mod vless;

pub use link::{Network, Profile, ProxyLink, Security};
pub use vless::{decode_uri, encode_uri};

use tracing::{debug, trace, warn};

use crate::error::ParseError;

// ============================================================================
// Line Parsing
// ============================================================================

/// Decodes one subscription line.
///
/// Lines starting with `vless://` are parsed as URIs. Anything else is tried
/// as a JSON object first and, failing that, as a URI without the prefix.
pub fn parse_line(line: &str) -> Result<ProxyLink, ParseError> {
    let line = line.trim();

    if line.starts_with(vless::VLESS_PREFIX) {
        return decode_uri(line);
    }

    match json::decode_json(line) {
        Ok(link) => Ok(link),
        Err(e) => {
            trace!("Line is not a JSON link ({}), trying as URI", e);
            decode_uri(line)
        }
    }
}

/// Decodes every line, dropping the ones that fail.
///
/// Blank lines are skipped silently; unparseable lines are logged.
pub fn parse_lines_lossy<S: AsRef<str>>(lines: &[S]) -> Vec<ProxyLink> {
    let mut links = Vec::with_capacity(lines.len());
    let mut failed = 0usize;

    for line in lines {
        let line = line.as_ref().trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Ok(link) => links.push(link),
            Err(e) => {
                failed += 1;
                let preview: String = line.chars().take(50).collect();
                warn!("Skipping unparseable line {:?}: {}", preview, e);
            }
        }
    }

    debug!(
        "Line parsing complete: {} parsed, {} skipped",
        links.len(),
        failed
    );

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_uri() {
        let link = parse_line("vless://u1@host1:443?type=ws#a").unwrap();
        assert_eq!(link.profile(), Profile::WebSocket);
    }

    #[test]
    fn test_parse_line_trims() {
        let link = parse_line("  vless://u1@host1:443#a \r").unwrap();
        assert_eq!(link.label, "a");
    }

    #[test]
    fn test_parse_line_json() {
        let link = parse_line(r#"{"id":"u1","add":"host1","port":"443","ps":"j"}"#).unwrap();
        assert_eq!(link.label, "j");
    }

    #[test]
    fn test_parse_line_malformed_json_falls_back_to_uri() {
        let link = parse_line("u1@host1:443?type=tcp#plain").unwrap();
        assert_eq!(link.id, "u1");
        assert_eq!(link.label, "plain");
    }

    #[test]
    fn test_parse_line_unparseable() {
        assert_eq!(
            parse_line("{broken json"),
            Err(ParseError::MissingIdentitySeparator)
        );
        assert_eq!(
            parse_line("vless://no-at-sign:443"),
            Err(ParseError::MissingIdentitySeparator)
        );
    }

    #[test]
    fn test_parse_lines_lossy_skips_bad_lines() {
        let lines = vec![
            "vless://host-without-id:443",
            "",
            "   ",
            "vless://u1@host1:443?type=tcp#ok",
            "garbage",
        ];
        let links = parse_lines_lossy(&lines);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].label, "ok");
    }

    #[test]
    fn test_parse_lines_lossy_preserves_order() {
        let lines = vec![
            "vless://u1@host1:443#first".to_string(),
            r#"{"id":"u2","add":"host2","port":443,"ps":"second"}"#.to_string(),
            "vless://u3@host3:443#third".to_string(),
        ];
        let labels: Vec<String> = parse_lines_lossy(&lines)
            .into_iter()
            .map(|l| l.label)
            .collect();
        assert_eq!(labels, vec!["first", "second", "third"]);
    }
}
