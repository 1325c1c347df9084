//! Default configuration values.
//!
//! Referenced from `#[serde(default = "...")]` attributes in [`super::types`].

use std::path::PathBuf;

use crate::config::{InitialDevices, LoggingConfig};

/// Returns the default seat name (`"seat0"`).
pub(crate) fn default_seat_name() -> String {
    "seat0".to_string()
}

/// Mirrors bind every class as soon as it appears unless told otherwise.
pub(crate) fn default_auto_bind() -> bool {
    true
}

/// One device of every class, matching the test seat the compositor boots with.
pub(crate) fn default_device_count() -> u64 {
    1
}

pub(crate) fn default_initial_devices() -> InitialDevices {
    InitialDevices {
        pointer: default_device_count(),
        keyboard: default_device_count(),
        touch: default_device_count(),
    }
}

/// Returns the default `LoggingConfig`.
///
/// Used by `SeatConfig` if the `[logging]` section is missing.
pub(crate) fn default_logging_config() -> LoggingConfig {
    LoggingConfig {
        level: default_log_level(),
        file_path: default_log_file_path(),
        format: default_log_format(),
    }
}

/// Returns the default log level string (`"info"`).
pub(crate) fn default_log_level() -> String {
    "info".to_string()
}

/// No log file by default.
pub(crate) fn default_log_file_path() -> Option<PathBuf> {
    None
}

/// Returns the default log format string (`"text"`).
pub(crate) fn default_log_format() -> String {
    "text".to_string()
}
