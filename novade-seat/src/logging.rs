//! Logging setup for the seat, built on the `tracing` ecosystem.
//!
//! Library code only emits `tracing` events; installing a subscriber is up to
//! the embedding process, either through [`init_logging`] with a
//! [`LoggingConfig`] or through [`init_minimal_logging`] before configuration
//! is available.

use std::io::stdout;
use std::path::Path;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use crate::config::LoggingConfig;
use crate::error::{CoreError, LoggingError};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Keeps the non-blocking file writer alive so buffered lines get flushed.
static LOG_WORKER_GUARD: Lazy<Mutex<Option<WorkerGuard>>> = Lazy::new(|| Mutex::new(None));

/// Installs a stderr subscriber filtered by `RUST_LOG` (default `info`).
///
/// Does nothing if a global subscriber is already set.
pub fn init_minimal_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));

    let _ = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .try_init();
}

/// Installs the global subscriber described by `config`: a stdout layer in the
/// configured format plus, if `file_path` is set, a daily-rolling file layer.
///
/// # Errors
/// - [`LoggingError::InitializationFailure`] for an unknown level or if a
///   global subscriber is already installed.
/// - [`CoreError::Filesystem`] if the log directory cannot be created.
pub fn init_logging(config: &LoggingConfig) -> Result<(), CoreError> {
    let level = parse_level(&config.level)?;

    let stdout_layer = match config.format.to_lowercase().as_str() {
        "json" => fmt::layer()
            .json()
            .with_writer(stdout)
            .with_ansi(false)
            .with_filter(EnvFilter::new(level.to_string()))
            .boxed(),
        _ => fmt::layer()
            .with_writer(stdout)
            .with_ansi(atty::is(atty::Stream::Stdout))
            .with_filter(EnvFilter::new(level.to_string()))
            .boxed(),
    };

    let mut layers: Vec<BoxedLayer> = vec![stdout_layer];
    let mut file_guard = None;
    if let Some(log_path) = &config.file_path {
        let (file_layer, guard) = create_file_layer(log_path, &config.format)?;
        layers.push(file_layer.with_filter(EnvFilter::new(level.to_string())).boxed());
        file_guard = Some(guard);
    }

    Registry::default().with(layers).try_init().map_err(|e| {
        LoggingError::InitializationFailure(format!(
            "Failed to set global tracing subscriber. Was it already initialized? Error: {e}"
        ))
    })?;

    match LOG_WORKER_GUARD.lock() {
        Ok(mut slot) => *slot = file_guard,
        Err(e) => {
            // The subscriber is installed; only flushing on exit is at risk.
            eprintln!("[ERROR] Failed to store log worker guard: {e}. Log flushing may be affected.");
        }
    }

    tracing::debug!(level = %level, format = %config.format, file = ?config.file_path, "logging initialized");
    Ok(())
}

fn parse_level(level: &str) -> Result<Level, LoggingError> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        invalid => Err(LoggingError::InitializationFailure(format!("Invalid log level in config: {invalid}"))),
    }
}

/// Builds a file layer writing through a daily-rolling, non-blocking appender.
///
/// The parent directory is created if needed. The returned guard must be kept
/// alive for as long as the layer is in use.
fn create_file_layer(log_path: &Path, format: &str) -> Result<(BoxedLayer, WorkerGuard), CoreError> {
    let directory = match log_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(directory).map_err(|source| CoreError::Filesystem {
        message: "Failed to create log directory".to_string(),
        path: directory.to_path_buf(),
        source,
    })?;

    let file_name = log_path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("seat.log"));
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(directory, file_name));

    let layer = match format.to_lowercase().as_str() {
        "json" => fmt::layer().json().with_writer(writer).with_ansi(false).boxed(),
        _ => fmt::layer().with_writer(writer).with_ansi(false).boxed(),
    };
    Ok((layer, guard))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn minimal_logging_can_be_called_twice() {
        init_minimal_logging();
        init_minimal_logging();
        tracing::info!("minimal logging active");
    }

    #[test]
    fn file_layer_creates_missing_directories() {
        let temp_dir = TempDir::new().expect("temp dir");
        let log_path = temp_dir.path().join("nested").join("seat.log");

        let (_layer, _guard) = create_file_layer(&log_path, "json").expect("file layer");
        assert!(temp_dir.path().join("nested").is_dir());
    }

    #[test]
    fn file_layer_reports_unusable_directory() {
        let temp_dir = TempDir::new().expect("temp dir");
        let blocker = temp_dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").expect("write file");

        let result = create_file_layer(&blocker.join("seat.log"), "text");
        assert!(matches!(result, Err(CoreError::Filesystem { .. })));
    }

    #[test]
    fn invalid_level_is_rejected_before_installing() {
        let config = LoggingConfig { level: "verbose".to_string(), ..LoggingConfig::default() };
        let err = init_logging(&config).expect_err("invalid level");
        match err {
            CoreError::Logging(err) => assert_eq!(
                err,
                LoggingError::InitializationFailure("Invalid log level in config: verbose".to_string())
            ),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn level_parsing_is_case_insensitive() {
        assert_eq!(parse_level("WARN").ok(), Some(Level::WARN));
        assert_eq!(parse_level("Trace").ok(), Some(Level::TRACE));
        assert!(parse_level("").is_err());
    }
}
