use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::helpers::expand_tilde;

/// Environment variables that override the upstream subscription location
pub const ENV_BASE_SUB_URL: &str = "BASE_SUB_URL";
pub const ENV_BASE_SUB_PORT: &str = "BASE_SUB_PORT";
pub const ENV_SUFFIX_SUB_URL: &str = "SUFFIX_SUB_URL";

// ============================================================================
// Generator Config Types
// ============================================================================

/// Service configuration parsed from TOML file
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct GeneratorConfig {
    /// Listen address of the HTTP server, default "0.0.0.0:9898"
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Scheme and host of the panel subscription service
    #[serde(default = "default_base_sub_url")]
    pub base_sub_url: String,

    /// Port of the panel subscription service
    #[serde(default = "default_base_sub_port")]
    pub base_sub_port: u16,

    /// Path segment the panel serves subscriptions under
    #[serde(default = "default_suffix_sub_url")]
    pub suffix_sub_url: String,

    /// Timeout for every outgoing HTTP request, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Accept self-signed certificates from the panel
    #[serde(default)]
    pub accept_invalid_certs: bool,

    #[serde(default)]
    pub sni: SniConfig,

    #[serde(default)]
    pub log: LogConfig,
}

/// Where SNI candidates come from
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SniSourceKind {
    /// `realitySettings.serverNames` of the panel inbound
    #[default]
    Xui,
    /// Remote whitelist, local file as fallback
    Remote,
    /// Local whitelist file
    File,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SniConfig {
    #[serde(default)]
    pub source: SniSourceKind,

    /// Panel SQLite database
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Remote whitelist, one domain per line
    #[serde(default = "default_whitelist_url")]
    pub whitelist_url: String,

    /// Local whitelist, one domain per line
    #[serde(default = "default_whitelist_file")]
    pub whitelist_file: String,
}

impl Default for SniConfig {
    fn default() -> Self {
        Self {
            source: SniSourceKind::default(),
            db_path: default_db_path(),
            whitelist_url: default_whitelist_url(),
            whitelist_file: default_whitelist_file(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LogConfig {
    /// Log filter, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Also write logs to this file
    #[serde(default)]
    pub file: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

// ============================================================================
// Generator Config Implementation
// ============================================================================

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            base_sub_url: default_base_sub_url(),
            base_sub_port: default_base_sub_port(),
            suffix_sub_url: default_suffix_sub_url(),
            request_timeout_secs: default_request_timeout(),
            accept_invalid_certs: false,
            sni: SniConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl GeneratorConfig {
    /// Parse config from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: GeneratorConfig =
            toml::from_str(content).context("Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from file path
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        Self::from_toml(&content)
    }

    /// Load config from an optional path, then apply environment overrides
    pub async fn load(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let expanded = expand_tilde(path);
                Self::from_file(Path::new(&expanded)).await?
            }
            None => {
                debug!("No config file given, using defaults");
                Self::default()
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in practice)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_SUB_URL) {
            self.base_sub_url = url;
        }
        if let Some(port) = lookup(ENV_BASE_SUB_PORT) {
            self.base_sub_port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}: {}", ENV_BASE_SUB_PORT, port))?;
        }
        if let Some(suffix) = lookup(ENV_SUFFIX_SUB_URL) {
            self.suffix_sub_url = suffix;
        }
        Ok(())
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;

        if !(self.base_sub_url.starts_with("http://") || self.base_sub_url.starts_with("https://"))
        {
            anyhow::bail!(
                "base_sub_url must start with http:// or https://: {}",
                self.base_sub_url
            );
        }

        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen
            .parse()
            .with_context(|| format!("Invalid listen address: {}", self.listen))
    }

    /// `{base_sub_url}:{base_sub_port}/{suffix_sub_url}`
    pub fn full_subscription_url(&self) -> String {
        format!(
            "{}:{}/{}",
            self.base_sub_url.trim_end_matches('/'),
            self.base_sub_port,
            self.suffix_sub_url.trim_matches('/')
        )
    }

    /// Upstream URL of one subscription
    pub fn subscription_url(&self, sub_id: &str) -> String {
        format!("{}/{}", self.full_subscription_url(), sub_id)
    }
}

fn default_listen() -> String {
    "0.0.0.0:9898".to_string()
}

fn default_base_sub_url() -> String {
    "https://127.0.0.1".to_string()
}

fn default_base_sub_port() -> u16 {
    2096
}

fn default_suffix_sub_url() -> String {
    "sub".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_db_path() -> String {
    "/app/db/x-ui.db".to_string()
}

fn default_whitelist_url() -> String {
    "https://raw.githubusercontent.com/hxehex/russia-mobile-internet-whitelist/refs/heads/main/whitelist.txt"
        .to_string()
}

fn default_whitelist_file() -> String {
    "whitelist".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}
