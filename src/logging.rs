//! # Structured Logging Module
//!
//! Environment-aware structured logging for worker binaries. The library itself
//! never installs a subscriber; hosts call [`init_structured_logging`] once and
//! scope client events through the span handed to the client.

use chrono::Utc;
use std::path::Path;
use std::process;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

static LOGGER_INITIALIZED: OnceLock<Option<WorkerGuard>> = OnceLock::new();

/// Initialize console logging, plus JSON file output when a log directory is configured
///
/// Safe to call more than once; only the first call takes effect.
pub fn init_structured_logging(config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = config
            .level
            .clone()
            .unwrap_or_else(|| get_log_level(&environment).to_string());

        let console_layer = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_ansi(true)
            .with_filter(build_filter(&log_level));

        let (file_layer, guard, log_path) = match config.log_dir.as_deref() {
            Some(log_dir) => match open_log_file(log_dir, &environment) {
                Ok((writer, guard, path)) => {
                    let layer = fmt::layer()
                        .with_writer(writer)
                        .with_target(true)
                        .with_level(true)
                        .with_ansi(false)
                        .json()
                        .with_filter(build_filter(&log_level));
                    (Some(layer), Some(guard), Some(path))
                }
                Err(e) => {
                    eprintln!("Failed to open log directory {}: {e}", log_dir.display());
                    (None, None, None)
                }
            },
            None => (None, None, None),
        };

        // A host may already own the global subscriber
        if tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer)
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            pid = process::id(),
            environment = %environment,
            log_file = log_path.as_deref().unwrap_or("<console only>"),
            "Structured logging initialized"
        );

        guard
    });
}

fn build_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn open_log_file(
    log_dir: &Path,
    environment: &str,
) -> std::io::Result<(
    tracing_appender::non_blocking::NonBlocking,
    WorkerGuard,
    String,
)> {
    std::fs::create_dir_all(log_dir)?;

    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let file_name = format!("{}.{}.{}.log", environment, process::id(), timestamp);
    let log_path = log_dir.join(&file_name).display().to_string();

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    Ok((writer, guard, log_path))
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("DCF_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

/// Log structured data for worker session operations
pub fn log_worker_operation(
    operation: &str,
    worker_id: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        worker_id = worker_id,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "WORKER_OPERATION"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_by_environment() {
        assert_eq!(get_log_level("production"), "info");
        assert_eq!(get_log_level("development"), "debug");
        assert_eq!(get_log_level("test"), "debug");
    }

    #[test]
    fn test_init_is_idempotent() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = LoggingConfig {
            level: Some("warn".to_string()),
            log_dir: Some(dir.path().to_path_buf()),
        };
        init_structured_logging(&config);
        init_structured_logging(&config);
        log_worker_operation("register", Some("1"), "ok", None);
    }
}
