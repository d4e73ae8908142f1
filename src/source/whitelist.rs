//! Whitelist-based SNI sources
//!
//! A whitelist is plain text with one domain per line. Blank lines and
//! lines starting with `#` are ignored. Whitelists are shared by every
//! subscription, so the subscription identifier is not used.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::SourceError;
use crate::generator::GeneratorConfig;
use crate::generator::helpers::{expand_tilde, fetch_text};

use super::SniSource;

/// Parses whitelist text into domains
pub fn parse_whitelist(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Local File
// ============================================================================

/// Whitelist read from a local file
pub struct WhitelistFileSource {
    path: PathBuf,
}

impl WhitelistFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and parses the file
    pub async fn read(&self) -> Result<Vec<String>, SourceError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SourceError::NotFound(self.path.display().to_string()));
            }
            Err(e) => return Err(SourceError::Io(e)),
        };

        let domains = parse_whitelist(&content);
        if domains.is_empty() {
            return Err(SourceError::Empty(self.path.display().to_string()));
        }

        info!(
            "Loaded {} SNI domains from local file {}",
            domains.len(),
            self.path.display()
        );
        Ok(domains)
    }
}

#[async_trait]
impl SniSource for WhitelistFileSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn load(&self, _sub_id: &str) -> Result<Vec<String>, SourceError> {
        self.read().await
    }
}

// ============================================================================
// Remote Whitelist
// ============================================================================

/// Where a whitelist was actually loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhitelistOrigin {
    Remote,
    LocalFile,
}

impl fmt::Display for WhitelistOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WhitelistOrigin::Remote => write!(f, "remote"),
            WhitelistOrigin::LocalFile => write!(f, "local"),
        }
    }
}

/// Whitelist fetched over HTTP with a local file as fallback.
///
/// The last loaded list is kept in memory until [`reload`](Self::reload).
pub struct RemoteWhitelistSource {
    client: reqwest::Client,
    url: String,
    fallback: WhitelistFileSource,
    cached: RwLock<Option<Vec<String>>>,
}

impl RemoteWhitelistSource {
    pub fn new(client: reqwest::Client, url: impl Into<String>, fallback: WhitelistFileSource) -> Self {
        Self {
            client,
            url: url.into(),
            fallback,
            cached: RwLock::new(None),
        }
    }

    pub fn from_config(config: &GeneratorConfig, client: reqwest::Client) -> Self {
        Self::new(
            client,
            config.sni.whitelist_url.clone(),
            WhitelistFileSource::new(expand_tilde(&config.sni.whitelist_file)),
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetches a fresh list, bypassing and then replacing the cache
    pub async fn reload(&self) -> Result<(Vec<String>, WhitelistOrigin), SourceError> {
        let (domains, origin) = self.fetch().await?;
        *self.cached.write().await = Some(domains.clone());
        debug!("Whitelist cache refreshed with {} domains", domains.len());
        Ok((domains, origin))
    }

    /// Cached list, loading it first if needed
    pub async fn current(&self) -> Result<Vec<String>, SourceError> {
        if let Some(domains) = self.cached.read().await.as_ref() {
            return Ok(domains.clone());
        }
        self.reload().await.map(|(domains, _)| domains)
    }

    async fn fetch(&self) -> Result<(Vec<String>, WhitelistOrigin), SourceError> {
        info!("Loading SNI from remote whitelist: {}", self.url);
        let remote = match fetch_text(&self.client, &self.url).await {
            Ok(text) => {
                let domains = parse_whitelist(&text);
                if domains.is_empty() {
                    Err(SourceError::Empty(self.url.clone()))
                } else {
                    Ok(domains)
                }
            }
            Err(e) => Err(e),
        };

        match remote {
            Ok(domains) => {
                info!("Loaded {} SNI domains from remote whitelist", domains.len());
                Ok((domains, WhitelistOrigin::Remote))
            }
            Err(e) => {
                warn!(
                    "Error loading remote whitelist: {}, falling back to {}",
                    e,
                    self.fallback.path().display()
                );
                let domains = self.fallback.read().await?;
                Ok((domains, WhitelistOrigin::LocalFile))
            }
        }
    }
}

#[async_trait]
impl SniSource for RemoteWhitelistSource {
    fn name(&self) -> &str {
        "remote"
    }

    async fn load(&self, _sub_id: &str) -> Result<Vec<String>, SourceError> {
        self.current().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    use crate::generator::helpers::build_http_client;

    fn write_whitelist(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn unreachable_remote(fallback: &Path) -> RemoteWhitelistSource {
        let client = build_http_client(Duration::from_secs(1), false).unwrap();
        RemoteWhitelistSource::new(
            client,
            "http://127.0.0.1:9/whitelist.txt",
            WhitelistFileSource::new(fallback),
        )
    }

    #[test]
    fn test_parse_whitelist() {
        let content = "# comment\n\na.com\n  b.com  \n#c.com\r\nd.com\r\n";
        assert_eq!(parse_whitelist(content), vec!["a.com", "b.com", "d.com"]);
    }

    #[test]
    fn test_parse_whitelist_empty() {
        assert!(parse_whitelist("").is_empty());
        assert!(parse_whitelist("# only\n\n").is_empty());
    }

    #[tokio::test]
    async fn test_file_source_reads_domains() {
        let file = write_whitelist("a.com\n# skip\nb.com\n");
        let source = WhitelistFileSource::new(file.path());
        assert_eq!(source.load("any").await.unwrap(), vec!["a.com", "b.com"]);
    }

    #[tokio::test]
    async fn test_file_source_missing_file() {
        let source = WhitelistFileSource::new("/nonexistent/sni/whitelist");
        assert!(matches!(
            source.load("any").await,
            Err(SourceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_file_source_empty_file() {
        let file = write_whitelist("# nothing here\n");
        let source = WhitelistFileSource::new(file.path());
        assert!(matches!(source.load("any").await, Err(SourceError::Empty(_))));
    }

    #[tokio::test]
    async fn test_remote_falls_back_to_file() {
        let file = write_whitelist("fallback.com\n");
        let source = unreachable_remote(file.path());
        let (domains, origin) = source.reload().await.unwrap();
        assert_eq!(domains, vec!["fallback.com"]);
        assert_eq!(origin, WhitelistOrigin::LocalFile);
    }

    #[tokio::test]
    async fn test_remote_without_fallback_fails() {
        let source = unreachable_remote(Path::new("/nonexistent/sni/whitelist"));
        assert!(source.load("any").await.is_err());
    }

    #[tokio::test]
    async fn test_remote_caches_until_reload() {
        let file = write_whitelist("first.com\n");
        let source = unreachable_remote(file.path());
        assert_eq!(source.load("any").await.unwrap(), vec!["first.com"]);

        std::fs::write(file.path(), "second.com\n").unwrap();
        assert_eq!(source.load("any").await.unwrap(), vec!["first.com"]);

        let (domains, _) = source.reload().await.unwrap();
        assert_eq!(domains, vec!["second.com"]);
        assert_eq!(source.load("any").await.unwrap(), vec!["second.com"]);
    }

    #[test]
    fn test_origin_display() {
        assert_eq!(WhitelistOrigin::Remote.to_string(), "remote");
        assert_eq!(WhitelistOrigin::LocalFile.to_string(), "local");
    }
}
