//! Configuration loading.
//!
//! [`ConfigLoader`] reads a TOML document into a [`SeatConfig`], applying
//! defaults for everything absent, and validates the result. A missing or
//! blank file is treated as an empty document.
//!
//! ```rust,ignore
//! use novade_seat::config::ConfigLoader;
//!
//! match ConfigLoader::load() {
//!     Ok(config) => println!("seat {}", config.name),
//!     Err(e) => {
//!         novade_seat::logging::init_minimal_logging();
//!         tracing::error!("Configuration loading failed: {}", e);
//!     }
//! }
//! ```

use std::env;
use std::fs;
use std::path::Path;

use crate::config::SeatConfig;
use crate::error::ConfigError;

/// Environment variable naming the configuration file read by [`ConfigLoader::load`].
pub const CONFIG_PATH_ENV: &str = "NOVADE_SEAT_CONFIG";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["text", "json"];

/// Namespace for configuration loading.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads the configuration named by `$NOVADE_SEAT_CONFIG`, or the defaults
    /// if the variable is unset.
    ///
    /// # Errors
    /// See [`Self::load_from_path`].
    pub fn load() -> Result<SeatConfig, ConfigError> {
        match env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::load_from_path(path),
            None => {
                tracing::debug!("{CONFIG_PATH_ENV} not set; using default seat configuration");
                Self::validate_config(SeatConfig::default())
            }
        }
    }

    /// Loads and validates the configuration file at `path`.
    ///
    /// # Errors
    /// - [`ConfigError::ReadError`] if the file exists but cannot be read.
    /// - [`ConfigError::ParseError`] / [`ConfigError::ValidationError`] as for
    ///   [`Self::from_toml_str`].
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<SeatConfig, ConfigError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "configuration file not found; using defaults");
                Self::validate_config(SeatConfig::default())
            }
            Err(source) => Err(ConfigError::ReadError { path: path.to_path_buf(), source }),
        }
    }

    /// Parses and validates a TOML document. A blank document yields the defaults.
    ///
    /// # Errors
    /// - [`ConfigError::ParseError`] for malformed TOML or unknown keys.
    /// - [`ConfigError::ValidationError`] for an empty seat name or an unknown
    ///   log level or format.
    pub fn from_toml_str(content: &str) -> Result<SeatConfig, ConfigError> {
        let config = if content.trim().is_empty() {
            SeatConfig::default()
        } else {
            toml::from_str(content)?
        };
        Self::validate_config(config)
    }

    /// Checks values serde cannot, normalising level and format to lowercase.
    fn validate_config(mut config: SeatConfig) -> Result<SeatConfig, ConfigError> {
        if config.name.trim().is_empty() {
            return Err(ConfigError::ValidationError("seat name must not be empty".to_string()));
        }

        let level = config.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log level: '{}'. Must be one of {:?}",
                config.logging.level, LOG_LEVELS
            )));
        }
        config.logging.level = level;

        let format = config.logging.format.to_lowercase();
        if !LOG_FORMATS.contains(&format.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log format: '{}'. Must be one of {:?}",
                config.logging.format, LOG_FORMATS
            )));
        }
        config.logging.format = format;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().expect("temp dir");
        let config = ConfigLoader::load_from_path(dir.path().join("absent.toml")).expect("defaults");
        assert_eq!(config, SeatConfig::default());
    }

    #[test]
    fn blank_file_yields_defaults() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "   \n").expect("write");
        let config = ConfigLoader::load_from_path(file.path()).expect("defaults");
        assert_eq!(config, SeatConfig::default());
    }

    #[test]
    fn file_values_are_loaded_and_normalised() {
        let mut file = NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"
            name = "seat-test"
            [devices]
            pointer = 0
            [logging]
            level = "DEBUG"
            format = "Json"
            "#
        )
        .expect("write");

        let config = ConfigLoader::load_from_path(file.path()).expect("valid config");
        assert_eq!(config.name, "seat-test");
        assert_eq!(config.devices.pointer, 0);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn reading_a_directory_is_a_read_error() {
        let dir = tempdir().expect("temp dir");
        let err = ConfigLoader::load_from_path(dir.path()).expect_err("directories are not files");
        assert!(matches!(err, ConfigError::ReadError { .. }), "got {err:?}");
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = ConfigLoader::from_toml_str("name = ").expect_err("malformed");
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn validation_rejects_bad_values() {
        for doc in ["name = \"  \"", "[logging]\nlevel = \"loud\"", "[logging]\nformat = \"xml\""] {
            let err = ConfigLoader::from_toml_str(doc).expect_err(doc);
            assert!(matches!(err, ConfigError::ValidationError(_)), "{doc}: {err:?}");
        }
    }
}
