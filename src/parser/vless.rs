//! VLESS link codec
//!
//! Format: `vless://id@host:port?params#label`
//!
//! Decoding cuts the line in a fixed order: identity (`@`), label (`#`),
//! query (`?`), then host/port on the *last* `:`. Each cut consumes its
//! delimiter, so a label may contain `@`, `?` or `:` and a bare IPv6 host
//! keeps its colons.

use std::collections::HashMap;

use tracing::trace;
use url::form_urlencoded;

use crate::error::ParseError;

use super::link::{DEFAULT_ENCRYPTION, DEFAULT_FINGERPRINT, DEFAULT_LABEL, Profile, ProxyLink};

/// URI scheme prefix
pub const VLESS_PREFIX: &str = "vless://";

// ============================================================================
// Query Parameters
// ============================================================================

/// Decoded `application/x-www-form-urlencoded` query.
///
/// A key may repeat; only its first non-empty value is kept. Keys with an
/// empty value are treated as absent.
#[derive(Debug, Default)]
struct QueryParams {
    values: HashMap<String, String>,
}

impl QueryParams {
    fn parse(query: &str) -> Self {
        let mut values = HashMap::new();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            if value.is_empty() {
                continue;
            }
            values
                .entry(key.into_owned())
                .or_insert_with(|| value.into_owned());
        }
        Self { values }
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn get_owned(&self, key: &str) -> Option<String> {
        self.get(key).map(str::to_string)
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// Decodes one `vless://` line into a [`ProxyLink`].
///
/// The `vless://` prefix is optional.
pub fn decode_uri(line: &str) -> Result<ProxyLink, ParseError> {
    let content = line.strip_prefix(VLESS_PREFIX).unwrap_or(line);

    let (id, server_part) = content
        .split_once('@')
        .ok_or(ParseError::MissingIdentitySeparator)?;

    let (rest, label) = match server_part.split_once('#') {
        Some((rest, fragment)) => (rest, decode_label(fragment)),
        None => (server_part, String::new()),
    };

    let (host_port, query) = rest.split_once('?').unwrap_or((rest, ""));

    let (host, port) = host_port
        .rsplit_once(':')
        .ok_or(ParseError::MissingPortSeparator)?;

    if id.is_empty() {
        return Err(ParseError::MissingIdentity);
    }
    if host.is_empty() {
        return Err(ParseError::MissingHost);
    }
    let port: u16 = port
        .parse()
        .map_err(|_| ParseError::InvalidPort(port.to_string()))?;

    let params = QueryParams::parse(query);

    let mut link = ProxyLink::new(id, host, port);
    link.label = if label.is_empty() {
        DEFAULT_LABEL.to_string()
    } else {
        label
    };
    link.set_network(params.get("type").unwrap_or("tcp").parse().unwrap_or_default());
    link.set_security(params.get("security").unwrap_or("tls").parse().unwrap_or_default());
    link.set_public_key(params.get_owned("pbk"));
    link.sni = params.get_owned("sni").unwrap_or_default();
    link.fingerprint = params
        .get_owned("fp")
        .unwrap_or_else(|| DEFAULT_FINGERPRINT.to_string());
    link.short_id = params.get_owned("sid");
    link.path = params.get_owned("path");
    link.spider_x = params.get_owned("spx");
    link.flow = params.get_owned("flow");
    link.encryption = params.get_owned("encryption");
    link.allow_insecure = params.get_owned("allowInsecure");
    link.host_header = params.get_owned("host");

    trace!(
        "Decoded VLESS link {}:{} (profile={}, sni={:?})",
        link.host,
        link.port,
        link.profile(),
        link.sni
    );

    Ok(link)
}

/// Percent-decodes a label; invalid UTF-8 becomes U+FFFD
fn decode_label(fragment: &str) -> String {
    String::from_utf8_lossy(&urlencoding::decode_binary(fragment.as_bytes())).into_owned()
}

// ============================================================================
// Encoding
// ============================================================================

/// Encodes a [`ProxyLink`] back into a `vless://` line.
///
/// `type`, `encryption` and `security` are always present; `fp` only for
/// Reality links; every other parameter only when it has a non-empty value.
/// The label is appended verbatim apart from escaped line breaks.
pub fn encode_uri(link: &ProxyLink) -> String {
    let mut params: Vec<(&str, &str)> = vec![
        ("type", link.network().as_str()),
        (
            "encryption",
            link.encryption.as_deref().unwrap_or(DEFAULT_ENCRYPTION),
        ),
        ("security", link.security().as_str()),
    ];

    if link.profile() == Profile::Reality {
        params.push(("fp", link.fingerprint.as_str()));
    }

    let optional = [
        ("sni", Some(link.sni.as_str())),
        ("pbk", link.public_key()),
        ("sid", link.short_id.as_deref()),
        ("flow", link.flow.as_deref()),
        ("path", link.path.as_deref()),
        ("spx", link.spider_x.as_deref()),
        ("host", link.host_header.as_deref()),
        ("allowInsecure", link.allow_insecure.as_deref()),
    ];
    params.extend(
        optional
            .into_iter()
            .filter_map(|(key, value)| value.filter(|v| !v.is_empty()).map(|v| (key, v))),
    );

    let mut uri = format!(
        "{}{}@{}:{}?{}",
        VLESS_PREFIX,
        link.id,
        link.host,
        link.port,
        encode_query(&params)
    );

    if !link.label.is_empty() {
        uri.push('#');
        uri.push_str(&encode_label(&link.label));
    }

    uri
}

/// Label as written after `#`: verbatim except for line breaks, which
/// would split the subscription envelope
fn encode_label(label: &str) -> String {
    label.replace('\r', "%0D").replace('\n', "%0A")
}

/// Form-encodes `key=value` pairs.
///
/// Unreserved characters (`A-Z a-z 0-9 - _ . ~`) pass through, space becomes
/// `+`, everything else is percent-encoded.
fn encode_query(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", encode_component(key), encode_component(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn encode_component(s: &str) -> String {
    urlencoding::encode(s).replace("%20", "+")
}
