//! SNI candidates from the panel database
//!
//! The panel stores every inbound in the `inbounds` table. The inbound
//! serving a subscription lists the subscription identifier somewhere in its
//! `settings` JSON, and its `stream_settings` JSON carries the allowed
//! server names under `realitySettings.serverNames`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::SourceError;

use super::{SniSource, clean_domains};

const INBOUND_QUERY: &str =
    "SELECT stream_settings FROM inbounds WHERE settings LIKE ?1 ESCAPE '\\' LIMIT 1";

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct StreamSettings {
    #[serde(default)]
    reality_settings: Option<RealitySettings>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct RealitySettings {
    #[serde(default)]
    server_names: Vec<String>,
}

/// Reads `realitySettings.serverNames` from the panel SQLite database
pub struct XuiDbSource {
    db_path: PathBuf,
}

impl XuiDbSource {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

#[async_trait]
impl SniSource for XuiDbSource {
    fn name(&self) -> &str {
        "x-ui"
    }

    async fn load(&self, sub_id: &str) -> Result<Vec<String>, SourceError> {
        let db_path = self.db_path.clone();
        let sub_id = sub_id.to_string();

        tokio::task::spawn_blocking(move || load_server_names(&db_path, &sub_id))
            .await
            .map_err(|e| SourceError::Database(format!("lookup task failed: {}", e)))?
    }
}

fn load_server_names(db_path: &Path, sub_id: &str) -> Result<Vec<String>, SourceError> {
    let conn = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;

    let pattern = format!("%{}%", escape_like(sub_id));
    let stream_settings: Option<String> = conn
        .query_row(INBOUND_QUERY, [&pattern], |row| row.get(0))
        .optional()?;

    let Some(stream_settings) = stream_settings else {
        return Err(SourceError::NotFound(sub_id.to_string()));
    };
    debug!("Loaded stream settings for {}: {}", sub_id, stream_settings);

    let settings: StreamSettings = serde_json::from_str(&stream_settings)
        .map_err(|e| SourceError::Database(format!("invalid stream_settings: {}", e)))?;

    let domains = clean_domains(
        settings
            .reality_settings
            .map(|r| r.server_names)
            .unwrap_or_default(),
    );
    if domains.is_empty() {
        return Err(SourceError::Empty(sub_id.to_string()));
    }

    info!("Loaded {} SNI domains from database", domains.len());
    Ok(domains)
}

/// Escapes LIKE wildcards so the identifier matches literally
fn escape_like(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_db(rows: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let conn = Connection::open(dir.path().join("x-ui.db")).unwrap();
        conn.execute(
            "CREATE TABLE inbounds (id INTEGER PRIMARY KEY, settings TEXT, stream_settings TEXT)",
            [],
        )
        .unwrap();
        for (settings, stream_settings) in rows {
            conn.execute(
                "INSERT INTO inbounds (settings, stream_settings) VALUES (?1, ?2)",
                [settings, stream_settings],
            )
            .unwrap();
        }
        dir
    }

    fn source(dir: &tempfile::TempDir) -> XuiDbSource {
        XuiDbSource::new(dir.path().join("x-ui.db"))
    }

    #[tokio::test]
    async fn test_loads_server_names() {
        let dir = create_db(&[
            (
                r#"{"clients":[{"subId":"other"}]}"#,
                r#"{"realitySettings":{"serverNames":["x.com"]}}"#,
            ),
            (
                r#"{"clients":[{"subId":"abc123"}]}"#,
                r#"{"network":"tcp","realitySettings":{"serverNames":["a.com","","b.com"]}}"#,
            ),
        ]);
        let names = source(&dir).load("abc123").await.unwrap();
        assert_eq!(names, vec!["a.com", "b.com"]);
    }

    #[tokio::test]
    async fn test_not_found() {
        let dir = create_db(&[(
            r#"{"clients":[{"subId":"other"}]}"#,
            r#"{"realitySettings":{"serverNames":["x.com"]}}"#,
        )]);
        assert!(matches!(
            source(&dir).load("abc123").await,
            Err(SourceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_server_names() {
        let dir = create_db(&[
            (
                r#"{"clients":[{"subId":"ws-sub"}]}"#,
                r#"{"network":"ws","wsSettings":{"path":"/ws"}}"#,
            ),
            (
                r#"{"clients":[{"subId":"empty-sub"}]}"#,
                r#"{"realitySettings":{"serverNames":[]}}"#,
            ),
        ]);
        assert!(matches!(
            source(&dir).load("ws-sub").await,
            Err(SourceError::Empty(_))
        ));
        assert!(matches!(
            source(&dir).load("empty-sub").await,
            Err(SourceError::Empty(_))
        ));
    }

    #[tokio::test]
    async fn test_wildcards_match_literally() {
        let dir = create_db(&[(
            r#"{"clients":[{"subId":"abc"}]}"#,
            r#"{"realitySettings":{"serverNames":["x.com"]}}"#,
        )]);
        assert!(matches!(
            source(&dir).load("%").await,
            Err(SourceError::NotFound(_))
        ));
        assert!(matches!(
            source(&dir).load("a_c").await,
            Err(SourceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_stream_settings() {
        let dir = create_db(&[(r#"{"subId":"abc"}"#, "not json")]);
        assert!(matches!(
            source(&dir).load("abc").await,
            Err(SourceError::Database(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_database() {
        let source = XuiDbSource::new("/nonexistent/db/x-ui.db");
        assert!(matches!(
            source.load("abc").await,
            Err(SourceError::Database(_))
        ));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("abc"), "abc");
        assert_eq!(escape_like("a%b_c\\d"), "a\\%b\\_c\\\\d");
    }
}
