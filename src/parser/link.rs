//! Structured form of a single subscription link
//!
//! A [`ProxyLink`] is what one `vless://` line (or one JSON line) decodes to.
//! The fields that drive classification (`network`, `security`,
//! `public_key`) are only reachable through setters so the stored
//! [`Profile`] can never go stale.

use std::fmt;
use std::str::FromStr;

/// Label assigned to links that carry none
pub const DEFAULT_LABEL: &str = "base-config";

/// Fingerprint assumed when a link does not name one
pub const DEFAULT_FINGERPRINT: &str = "chrome";

/// Encryption emitted when a link leaves it unset
pub const DEFAULT_ENCRYPTION: &str = "none";

// ============================================================================
// Network / Security
// ============================================================================

/// Transport network (`type` query parameter)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Network {
    #[default]
    Tcp,
    Ws,
    Other(String),
}

impl Network {
    pub fn as_str(&self) -> &str {
        match self {
            Network::Tcp => "tcp",
            Network::Ws => "ws",
            Network::Other(s) => s,
        }
    }
}

impl FromStr for Network {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "tcp" => Network::Tcp,
            "ws" => Network::Ws,
            other => Network::Other(other.to_string()),
        })
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport security (`security` query parameter)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Security {
    #[default]
    Tls,
    Reality,
    None,
    Other(String),
}

impl Security {
    pub fn as_str(&self) -> &str {
        match self {
            Security::Tls => "tls",
            Security::Reality => "reality",
            Security::None => "none",
            Security::Other(s) => s,
        }
    }
}

impl FromStr for Security {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "tls" => Security::Tls,
            "reality" => Security::Reality,
            "none" => Security::None,
            other => Security::Other(other.to_string()),
        })
    }
}

impl fmt::Display for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Profile
// ============================================================================

/// Transport/security profile, decides how a link is fanned out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Profile {
    Reality,
    WebSocket,
    Other,
}

impl Profile {
    /// Classifies a link from its classifying fields.
    ///
    /// WebSocket wins over Reality: a `ws` link is `WebSocket` even when it
    /// also carries `security=reality` and a public key.
    pub fn classify(network: &Network, security: &Security, public_key: Option<&str>) -> Profile {
        if *network == Network::Ws {
            return Profile::WebSocket;
        }
        if *security == Security::Reality && public_key.is_some_and(|k| !k.is_empty()) {
            return Profile::Reality;
        }
        Profile::Other
    }

    /// Whether links of this profile are multiplied across SNI candidates
    pub fn is_fan_out(self) -> bool {
        matches!(self, Profile::Reality | Profile::WebSocket)
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::Reality => write!(f, "reality"),
            Profile::WebSocket => write!(f, "websocket"),
            Profile::Other => write!(f, "other"),
        }
    }
}

// ============================================================================
// ProxyLink
// ============================================================================

/// One decoded subscription entry.
///
/// `Option<String>` fields distinguish "unset" (`None`, never emitted) from
/// a value that was supplied. Empty strings are never emitted either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyLink {
    /// Identity token (UUID-like)
    pub id: String,
    pub host: String,
    pub port: u16,
    /// Display label
    pub label: String,
    pub sni: String,
    pub fingerprint: String,
    pub short_id: Option<String>,
    pub flow: Option<String>,
    pub path: Option<String>,
    /// Wildcard/steal path (`spx`)
    pub spider_x: Option<String>,
    /// Inbound `Host` header
    pub host_header: Option<String>,
    pub allow_insecure: Option<String>,
    pub encryption: Option<String>,
    network: Network,
    security: Security,
    public_key: Option<String>,
    profile: Profile,
}

impl ProxyLink {
    /// Creates a link with default transport settings (`tcp` + `tls`)
    pub fn new(id: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
            port,
            label: DEFAULT_LABEL.to_string(),
            sni: String::new(),
            fingerprint: DEFAULT_FINGERPRINT.to_string(),
            short_id: None,
            flow: None,
            path: None,
            spider_x: None,
            host_header: None,
            allow_insecure: None,
            encryption: None,
            network: Network::default(),
            security: Security::default(),
            public_key: None,
            profile: Profile::Other,
        }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn security(&self) -> &Security {
        &self.security
    }

    pub fn public_key(&self) -> Option<&str> {
        self.public_key.as_deref()
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    pub fn set_network(&mut self, network: Network) {
        self.network = network;
        self.reclassify();
    }

    pub fn set_security(&mut self, security: Security) {
        self.security = security;
        self.reclassify();
    }

    pub fn set_public_key(&mut self, public_key: Option<String>) {
        self.public_key = public_key;
        self.reclassify();
    }

    pub fn with_network(mut self, network: Network) -> Self {
        self.set_network(network);
        self
    }

    pub fn with_security(mut self, security: Security) -> Self {
        self.set_security(security);
        self
    }

    pub fn with_public_key(mut self, public_key: impl Into<String>) -> Self {
        self.set_public_key(Some(public_key.into()));
        self
    }

    /// Copy of this link pointed at another SNI, labelled after it
    pub fn with_sni(&self, sni: &str) -> Self {
        let mut link = self.clone();
        link.sni = sni.to_string();
        link.label = format!("{} - sni:{}", self.label, sni);
        link
    }

    fn reclassify(&mut self) {
        self.profile = Profile::classify(&self.network, &self.security, self.public_key.as_deref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_from_str() {
        assert_eq!("tcp".parse::<Network>().unwrap(), Network::Tcp);
        assert_eq!("ws".parse::<Network>().unwrap(), Network::Ws);
        assert_eq!(
            "grpc".parse::<Network>().unwrap(),
            Network::Other("grpc".to_string())
        );
        assert_eq!(Network::Other("xhttp".into()).to_string(), "xhttp");
    }

    #[test]
    fn test_security_from_str() {
        assert_eq!("tls".parse::<Security>().unwrap(), Security::Tls);
        assert_eq!("reality".parse::<Security>().unwrap(), Security::Reality);
        assert_eq!("none".parse::<Security>().unwrap(), Security::None);
        assert_eq!(
            "xtls".parse::<Security>().unwrap(),
            Security::Other("xtls".to_string())
        );
    }

    #[test]
    fn test_classify_websocket() {
        let profile = Profile::classify(&Network::Ws, &Security::Tls, None);
        assert_eq!(profile, Profile::WebSocket);
    }

    #[test]
    fn test_classify_websocket_beats_reality() {
        let profile = Profile::classify(&Network::Ws, &Security::Reality, Some("ABC"));
        assert_eq!(profile, Profile::WebSocket);
    }

    #[test]
    fn test_classify_reality() {
        let profile = Profile::classify(&Network::Tcp, &Security::Reality, Some("ABC"));
        assert_eq!(profile, Profile::Reality);
    }

    #[test]
    fn test_classify_reality_without_key() {
        assert_eq!(
            Profile::classify(&Network::Tcp, &Security::Reality, None),
            Profile::Other
        );
        assert_eq!(
            Profile::classify(&Network::Tcp, &Security::Reality, Some("")),
            Profile::Other
        );
    }

    #[test]
    fn test_classify_other() {
        let grpc = Network::Other("grpc".into());
        assert_eq!(
            Profile::classify(&grpc, &Security::Tls, None),
            Profile::Other
        );
        assert_eq!(
            Profile::classify(&Network::Tcp, &Security::Tls, Some("ABC")),
            Profile::Other
        );
    }

    #[test]
    fn test_profile_is_fan_out() {
        assert!(Profile::Reality.is_fan_out());
        assert!(Profile::WebSocket.is_fan_out());
        assert!(!Profile::Other.is_fan_out());
    }

    #[test]
    fn test_setters_reclassify() {
        let mut link = ProxyLink::new("u1", "host1", 443);
        assert_eq!(link.profile(), Profile::Other);

        link.set_security(Security::Reality);
        assert_eq!(link.profile(), Profile::Other);

        link.set_public_key(Some("ABC".into()));
        assert_eq!(link.profile(), Profile::Reality);

        link.set_network(Network::Ws);
        assert_eq!(link.profile(), Profile::WebSocket);

        link.set_network(Network::Other("grpc".into()));
        link.set_public_key(None);
        assert_eq!(link.profile(), Profile::Other);
    }

    #[test]
    fn test_with_sni() {
        let mut base = ProxyLink::new("u1", "host1", 443).with_network(Network::Ws);
        base.label = "label1".to_string();
        base.sni = "orig.com".to_string();

        let copy = base.with_sni("s1.com");
        assert_eq!(copy.sni, "s1.com");
        assert_eq!(copy.label, "label1 - sni:s1.com");
        assert_eq!(copy.profile(), Profile::WebSocket);

        // Base is untouched
        assert_eq!(base.sni, "orig.com");
        assert_eq!(base.label, "label1");
    }

    #[test]
    fn test_profile_display() {
        assert_eq!(Profile::Reality.to_string(), "reality");
        assert_eq!(Profile::WebSocket.to_string(), "websocket");
        assert_eq!(Profile::Other.to_string(), "other");
    }
}
