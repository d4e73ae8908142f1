//! Subscription generator
//!
//! This module turns one upstream subscription into a multi-SNI one:
//! envelope decode, line parsing, SNI fan-out, link encoding, envelope
//! encode. [`build_subscription`] is the pure part; [`Generator`] adds the
//! upstream fetch and SNI lookup around it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::error::{EmptyResultError, GenerateError};
use crate::parser::{encode_uri, parse_lines_lossy};
use crate::source::{RemoteWhitelistSource, SniSource, build_source};

// Sub-modules
pub mod assembler;
pub mod fanout;
pub mod generator_config;
pub mod helpers;

// Re-exports
pub use assembler::{decode_envelope, encode_envelope};
pub use fanout::{expand, needs_sni};
pub use generator_config::GeneratorConfig;
pub use helpers::{build_http_client, expand_tilde, fetch_text};

// ============================================================================
// Core Pipeline
// ============================================================================

/// Rewrites an upstream envelope against the SNI candidates.
///
/// Unparseable lines are skipped. Fails when the envelope itself is
/// malformed or when nothing is left to return.
pub fn build_subscription<S: AsRef<str>>(
    envelope: &str,
    sni_list: &[S],
) -> Result<String, GenerateError> {
    let lines = decode_envelope(envelope)?;
    debug!("Found {} config lines in subscription", lines.len());

    let base_links = parse_lines_lossy(&lines);
    debug!("Parsed {} base configs", base_links.len());
    if base_links.is_empty() {
        return Err(EmptyResultError::NoBaseConfigs.into());
    }

    if sni_list.is_empty() && needs_sni(&base_links) {
        return Err(EmptyResultError::NoSniCandidates.into());
    }

    let expanded = expand(&base_links, sni_list);
    if expanded.is_empty() {
        return Err(EmptyResultError::NoOutput.into());
    }

    let uris: Vec<String> = expanded.iter().map(encode_uri).collect();
    info!(
        "Generated {} configs from {} base configs and {} SNI candidates",
        uris.len(),
        base_links.len(),
        sni_list.len()
    );

    Ok(encode_envelope(&uris))
}

// ============================================================================
// Generator
// ============================================================================

/// Serves multi-SNI subscriptions for the configured panel
pub struct Generator {
    config: GeneratorConfig,
    client: reqwest::Client,
    source: Arc<dyn SniSource>,
    whitelist: Arc<RemoteWhitelistSource>,
}

impl Generator {
    /// Create a new generator with the given config
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        let client = build_http_client(
            Duration::from_secs(config.request_timeout_secs),
            config.accept_invalid_certs,
        )?;
        let whitelist = Arc::new(RemoteWhitelistSource::from_config(&config, client.clone()));
        let source = build_source(&config, whitelist.clone());
        info!("Using SNI source '{}'", source.name());

        Ok(Self {
            config,
            client,
            source,
            whitelist,
        })
    }

    /// Create a generator with an explicit SNI source
    pub fn with_source(config: GeneratorConfig, source: Arc<dyn SniSource>) -> Result<Self> {
        let mut generator = Self::new(config)?;
        generator.source = source;
        Ok(generator)
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// The shared remote whitelist, used by the debug and reload endpoints
    pub fn whitelist(&self) -> &RemoteWhitelistSource {
        &self.whitelist
    }

    /// Generates the multi-SNI subscription for `sub_id`
    pub async fn generate(&self, sub_id: &str) -> Result<String, GenerateError> {
        let sni_list = match self.source.load(sub_id).await {
            Ok(list) => list,
            Err(e) if e.is_unavailable() => {
                warn!("No SNI list for '{}': {}", sub_id, e);
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };
        debug!("Processing {} SNI domains", sni_list.len());

        let url = self.config.subscription_url(sub_id);
        info!("Fetching base subscription from: {}", url);
        let envelope = fetch_text(&self.client, &url).await?;
        debug!("Raw subscription response length: {}", envelope.len());

        build_subscription(&envelope, &sni_list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EnvelopeError;
    use crate::parser::base64::encode_base64;

    fn envelope(lines: &[&str]) -> String {
        encode_base64(lines.join("\n").as_bytes())
    }

    #[test]
    fn test_build_subscription_reality() {
        let input = envelope(&[
            "vless://u1@host1:443?type=tcp&security=reality&pbk=ABC&sni=a.com&fp=chrome#label1",
        ]);
        let output = build_subscription(&input, &["s1.com", "s2.com"]).unwrap();
        let lines = decode_envelope(&output).unwrap();
        assert_eq!(
            lines,
            vec![
                "vless://u1@host1:443?type=tcp&encryption=none&security=reality&fp=chrome&sni=s1.com&pbk=ABC#label1 - sni:s1.com",
                "vless://u1@host1:443?type=tcp&encryption=none&security=reality&fp=chrome&sni=s2.com&pbk=ABC#label1 - sni:s2.com",
            ]
        );
    }

    #[test]
    fn test_build_subscription_no_base_configs() {
        let input = envelope(&["not a link", "vless://missing-at:443"]);
        let err = build_subscription(&input, &["s1.com"]).unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Empty(EmptyResultError::NoBaseConfigs)
        ));
    }

    #[test]
    fn test_build_subscription_no_sni_for_fan_out() {
        let input = envelope(&["vless://u1@host1:443?type=ws#w"]);
        let empty: [&str; 0] = [];
        let err = build_subscription(&input, &empty).unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Empty(EmptyResultError::NoSniCandidates)
        ));
    }

    #[test]
    fn test_build_subscription_no_sni_pass_through_only() {
        let input = envelope(&["vless://u1@host1:443?type=grpc&security=tls#g"]);
        let empty: [&str; 0] = [];
        let output = build_subscription(&input, &empty).unwrap();
        assert_eq!(decode_envelope(&output).unwrap().len(), 1);
    }

    #[test]
    fn test_build_subscription_bad_envelope() {
        let err = build_subscription("%%%", &["s1.com"]).unwrap_err();
        assert!(matches!(err, GenerateError::Envelope(EnvelopeError::Base64)));
    }

    #[test]
    fn test_generator_new() {
        let generator = Generator::new(GeneratorConfig::default()).unwrap();
        assert_eq!(generator.config().base_sub_port, 2096);
        assert!(generator.whitelist().url().starts_with("https://"));
    }
}
