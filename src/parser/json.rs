//! JSON link form
//!
//! Some panels emit one JSON object per line instead of a URI, using the
//! v2rayN share keys: `{"ps": "name", "add": "host", "port": "443", "id": "...", ...}`.
//! Unknown keys (`v`, `aid`, `scy`, `alpn`, ...) are ignored.

use serde::Deserialize;
use tracing::trace;

use crate::error::ParseError;

use super::link::{DEFAULT_FINGERPRINT, DEFAULT_LABEL, Network, ProxyLink, Security};

/// One JSON link line
#[derive(Deserialize, Debug)]
struct JsonLink {
    /// Identity token
    id: String,
    /// Server address
    add: String,
    /// Server port (string or number)
    #[serde(deserialize_with = "deserialize_port")]
    port: u16,
    /// Display label
    #[serde(default, deserialize_with = "deserialize_loose_string")]
    ps: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_string")]
    net: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_string")]
    tls: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_string")]
    sni: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_string")]
    fp: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_string")]
    pbk: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_string")]
    sid: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_string")]
    flow: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_string")]
    path: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_string")]
    spx: Option<String>,
    /// Inbound `Host` header
    #[serde(default, deserialize_with = "deserialize_loose_string")]
    host: Option<String>,
    #[serde(
        default,
        rename = "allowInsecure",
        deserialize_with = "deserialize_loose_string"
    )]
    allow_insecure: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_string")]
    encryption: Option<String>,
}

/// Decodes one JSON object line into a [`ProxyLink`]
pub fn decode_json(line: &str) -> Result<ProxyLink, ParseError> {
    let json: JsonLink =
        serde_json::from_str(line).map_err(|e| ParseError::Json(e.to_string()))?;

    if json.id.is_empty() {
        return Err(ParseError::MissingIdentity);
    }
    if json.add.is_empty() {
        return Err(ParseError::MissingHost);
    }

    let network: Network = match json.net.as_deref() {
        Some(net) => net.parse().unwrap_or_default(),
        None => Network::Tcp,
    };
    let security: Security = match json.tls.as_deref() {
        Some(tls) => tls.parse().unwrap_or_default(),
        None => Security::Tls,
    };

    let mut link = ProxyLink::new(json.id, json.add, json.port)
        .with_network(network)
        .with_security(security);
    link.set_public_key(json.pbk);
    link.label = json.ps.unwrap_or_else(|| DEFAULT_LABEL.to_string());
    link.sni = json.sni.unwrap_or_default();
    link.fingerprint = json.fp.unwrap_or_else(|| DEFAULT_FINGERPRINT.to_string());
    link.short_id = json.sid;
    link.flow = json.flow;
    link.path = json.path;
    link.spider_x = json.spx;
    link.host_header = json.host;
    link.allow_insecure = json.allow_insecure;
    link.encryption = json.encryption;

    trace!(
        "Decoded JSON link {}:{} (profile={})",
        link.host,
        link.port,
        link.profile()
    );

    Ok(link)
}

/// Custom deserializer for port (handles both string and number)
fn deserialize_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortValue {
        Number(u16),
        String(String),
    }

    match PortValue::deserialize(deserializer)? {
        PortValue::Number(n) => Ok(n),
        PortValue::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Accepts strings, numbers, booleans or null; empty strings become `None`
fn deserialize_loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum LooseValue {
        String(String),
        Number(serde_json::Number),
        Bool(bool),
    }

    Ok(match Option::<LooseValue>::deserialize(deserializer)? {
        Some(LooseValue::String(s)) if s.is_empty() => None,
        Some(LooseValue::String(s)) => Some(s),
        Some(LooseValue::Number(n)) => Some(n.to_string()),
        Some(LooseValue::Bool(b)) => Some(String::from(if b { "1" } else { "0" })),
        None => None,
    })
}
