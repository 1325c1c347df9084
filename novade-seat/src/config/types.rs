//! Configuration data structures.
//!
//! All structs reject unknown keys (`deny_unknown_fields`) and fill absent
//! keys from [`super::defaults`].

use serde::Deserialize;
use std::path::PathBuf;

use super::defaults;
use crate::input::registry::DeviceRegistry;
use crate::input::seat::DeviceClass;

/// Root configuration of one seat.
///
/// # Examples
///
/// ```
/// use novade_seat::config::SeatConfig;
///
/// let config: SeatConfig = toml::from_str(r#"
/// name = "seat1"
/// [devices]
/// touch = 0
/// "#).unwrap();
/// assert_eq!(config.name, "seat1");
/// assert!(config.auto_bind);
/// assert_eq!(config.devices.pointer, 1);
/// assert_eq!(config.devices.touch, 0);
/// assert_eq!(config.logging.level, "info");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeatConfig {
    /// Advertised as `wl_seat.name`.
    #[serde(default = "defaults::default_seat_name")]
    pub name: String,
    /// Whether client mirrors bind a class as soon as it becomes available.
    #[serde(default = "defaults::default_auto_bind")]
    pub auto_bind: bool,
    /// Devices present when the seat starts.
    #[serde(default = "defaults::default_initial_devices")]
    pub devices: InitialDevices,
    #[serde(default = "defaults::default_logging_config")]
    pub logging: LoggingConfig,
}

impl Default for SeatConfig {
    fn default() -> Self {
        Self {
            name: defaults::default_seat_name(),
            auto_bind: defaults::default_auto_bind(),
            devices: defaults::default_initial_devices(),
            logging: defaults::default_logging_config(),
        }
    }
}

/// Number of devices per class at seat start-up (the `[devices]` table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InitialDevices {
    #[serde(default = "defaults::default_device_count")]
    pub pointer: u64,
    #[serde(default = "defaults::default_device_count")]
    pub keyboard: u64,
    #[serde(default = "defaults::default_device_count")]
    pub touch: u64,
}

impl InitialDevices {
    pub fn count(&self, class: DeviceClass) -> u64 {
        match class {
            DeviceClass::Pointer => self.pointer,
            DeviceClass::Keyboard => self.keyboard,
            DeviceClass::Touch => self.touch,
        }
    }

    /// A registry seeded with these counts.
    pub fn registry(&self) -> DeviceRegistry {
        DeviceRegistry::with_counts(self.pointer, self.keyboard, self.touch)
    }
}

impl Default for InitialDevices {
    fn default() -> Self {
        defaults::default_initial_devices()
    }
}

/// Configuration settings for the logging subsystem.
///
/// Used by [`crate::logging::init_logging`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Minimum level: "trace", "debug", "info", "warn" or "error" (case-insensitive).
    #[serde(default = "defaults::default_log_level")]
    pub level: String,
    /// Optional log file; rotated daily. `None` disables file logging.
    #[serde(default = "defaults::default_log_file_path")]
    pub file_path: Option<PathBuf>,
    /// "text" or "json" (case-insensitive).
    #[serde(default = "defaults::default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        defaults::default_logging_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_document_yields_defaults() {
        let config: SeatConfig = toml::from_str("").expect("empty TOML is valid");
        assert_eq!(config, SeatConfig::default());
        assert_eq!(config.devices.registry(), DeviceRegistry::with_counts(1, 1, 1));
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config: SeatConfig = toml::from_str(
            r#"
            auto_bind = false
            [devices]
            keyboard = 3
            [logging]
            format = "json"
            "#,
        )
        .expect("valid TOML");

        assert!(!config.auto_bind);
        assert_eq!(config.devices, InitialDevices { pointer: 1, keyboard: 3, touch: 1 });
        assert_eq!(config.devices.count(DeviceClass::Keyboard), 3);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file_path, None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<SeatConfig>("colour = \"blue\"").is_err());
        assert!(toml::from_str::<SeatConfig>("[devices]\ntablet = 1").is_err());
    }
}
