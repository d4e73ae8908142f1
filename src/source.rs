//! SNI candidate sources
//!
//! A source turns a subscription identifier into an ordered list of domain
//! names. Three sources exist:
//! - [`XuiDbSource`]: the `realitySettings.serverNames` of the panel inbound
//!   serving the subscription
//! - [`WhitelistFileSource`]: a local whitelist file
//! - [`RemoteWhitelistSource`]: a whitelist fetched over HTTP, falling back
//!   to the local file

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::generator::GeneratorConfig;
use crate::generator::generator_config::SniSourceKind;
use crate::generator::helpers::expand_tilde;

pub mod whitelist;
pub mod xui;

pub use whitelist::{RemoteWhitelistSource, WhitelistFileSource, WhitelistOrigin, parse_whitelist};
pub use xui::XuiDbSource;

// ============================================================================
// SNI Source Trait
// ============================================================================

/// Provider of SNI candidates for a subscription
#[async_trait]
pub trait SniSource: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Loads the candidates for `sub_id`.
    ///
    /// Returns [`SourceError::NotFound`] when nothing matches and
    /// [`SourceError::Empty`] when the match lists no domains.
    async fn load(&self, sub_id: &str) -> Result<Vec<String>, SourceError>;
}

/// Builds the source selected in the config
pub fn build_source(
    config: &GeneratorConfig,
    whitelist: Arc<RemoteWhitelistSource>,
) -> Arc<dyn SniSource> {
    match config.sni.source {
        SniSourceKind::Xui => Arc::new(XuiDbSource::new(expand_tilde(&config.sni.db_path))),
        SniSourceKind::File => Arc::new(WhitelistFileSource::new(expand_tilde(
            &config.sni.whitelist_file,
        ))),
        SniSourceKind::Remote => whitelist,
    }
}

/// Drops empty entries, keeping order
pub(crate) fn clean_domains<I>(domains: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    domains
        .into_iter()
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .collect()
}
