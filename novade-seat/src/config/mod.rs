//! Seat configuration.
//!
//! - [`types`]: [`SeatConfig`] and its sections, deserialized from TOML.
//! - [`defaults`]: per-field defaults used by `serde` when a key is absent.
//! - [`loader`]: [`ConfigLoader`], which reads, parses and validates a [`SeatConfig`].
//!
//! A missing or empty configuration file is not an error; the defaults
//! describe a seat named `seat0` with one device of every class.

pub mod defaults;
pub mod loader;
pub mod types;

pub use loader::{ConfigLoader, CONFIG_PATH_ENV};
pub use types::{InitialDevices, LoggingConfig, SeatConfig};
