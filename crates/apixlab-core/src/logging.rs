//! Tracing subscriber setup.
//!
//! Filter resolution: `APIXLAB_LOG` env var > `[log].filter` > `info`.
//! Records go to a daily rolling file under `<home>/logs` and, when
//! `verbose` is set, to stderr as well.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::config::LogConfig;

pub const LOG_ENV: &str = "APIXLAB_LOG";
const LOG_FILE_PREFIX: &str = "apixlab.log";

/// Builds the filter from `APIXLAB_LOG`, falling back to the configured
/// directive.
pub fn env_filter(config: &LogConfig) -> EnvFilter {
    let directive = std::env::var(LOG_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| config.filter.clone());
    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber.
///
/// Keep the returned guard alive for the lifetime of the process; dropping
/// it flushes and stops the file writer.
///
/// # Errors
/// Returns an error if the log directory cannot be created or a global
/// subscriber is already installed.
pub fn init(config: &LogConfig, logs_dir: &Path, verbose: bool) -> Result<Option<WorkerGuard>> {
    let (file_layer, guard) = if config.file {
        std::fs::create_dir_all(logs_dir)
            .with_context(|| format!("Failed to create log directory {}", logs_dir.display()))?;
        let appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .with_filter(env_filter(config));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let stderr_layer = verbose.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(env_filter(config))
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
