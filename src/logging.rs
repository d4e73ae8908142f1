//! Tracing setup
//!
//! Logs always go to stderr. When `log.file` is set they are also written to
//! that file through a non-blocking appender.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::generator::generator_config::LogConfig;

/// Filter directives in effect.
///
/// `verbose` forces `trace`; otherwise `RUST_LOG` wins over the configured
/// level, and an unparseable level falls back to `info`.
pub fn filter_directives(config: &LogConfig, verbose: bool) -> String {
    if verbose {
        return "trace".to_string();
    }
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if EnvFilter::try_new(&directives).is_ok() => directives,
        _ if EnvFilter::try_new(&config.level).is_ok() => config.level.clone(),
        _ => "info".to_string(),
    }
}

/// Initialize logging to stderr and, if configured, a log file.
///
/// The returned guard must be held for the life of the process so buffered
/// file output is flushed.
pub fn init_logging(config: &LogConfig, verbose: bool) -> Result<Option<WorkerGuard>> {
    let directives = filter_directives(config, verbose);

    let (file_writer, guard) = match &config.file {
        Some(log_file) => {
            let (writer, guard) = open_log_file(log_file)?;
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let file_layer = file_writer.map(|writer| {
        tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(false)
            .with_filter(EnvFilter::new(&directives))
    });

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(&directives));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .init();

    Ok(guard)
}

fn open_log_file(log_file: &str) -> Result<(NonBlocking, WorkerGuard)> {
    let path = Path::new(log_file);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    let file_name = path
        .file_name()
        .with_context(|| format!("Log file path has no file name: {}", log_file))?;

    Ok(tracing_appender::non_blocking(
        tracing_appender::rolling::never(dir, file_name),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_config(level: &str) -> LogConfig {
        LogConfig {
            level: level.to_string(),
            file: None,
        }
    }

    #[test]
    fn test_verbose_forces_trace() {
        assert_eq!(filter_directives(&log_config("warn"), true), "trace");
    }

    #[test]
    fn test_configured_level_used_without_env() {
        if std::env::var(EnvFilter::DEFAULT_ENV).is_err() {
            assert_eq!(filter_directives(&log_config("debug"), false), "debug");
            assert_eq!(filter_directives(&log_config("sni_fanout=warn"), false), "sni_fanout=warn");
        }
    }

    #[test]
    fn test_open_log_file_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sni-fanout.log");
        let (_writer, _guard) = open_log_file(path.to_str().unwrap()).unwrap();
        assert!(dir.path().join("nested").is_dir());
    }
}
