//! Error handling for the NovaDE seat layer.
//!
//! [`SeatError`] covers contract violations inside the capability core. None of
//! its variants is ever encoded into a protocol event: they are logged where
//! they are detected and the offending request is dropped.
//!
//! [`CoreError`] is the umbrella type returned by start-up code (configuration
//! loading, logging initialization) and wraps the more specific errors.

use std::path::PathBuf;
use thiserror::Error;

use crate::input::seat::DeviceClass;
use crate::protocol::{ClientId, HandleId};

/// Errors raised by the device registry, the arbiter and device handles.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeatError {
    /// A device of `class` was removed while none was registered.
    #[error("no {class} device is registered on this seat")]
    NoDeviceOfClass { class: DeviceClass },

    /// An operation targeted a handle whose capability was withdrawn after binding.
    #[error("handle {handle} ({class}) has been revoked; operation ignored")]
    UseOfRevokedHandle { handle: HandleId, class: DeviceClass },

    /// A request referenced a handle that was already released or never bound.
    #[error("handle {handle} is not bound (already released?)")]
    UseAfterRelease { handle: HandleId },

    /// A request carried a handle id that the client is still using.
    #[error("handle {handle} is already bound")]
    HandleInUse { handle: HandleId },

    /// An operation only valid for one device class was issued on another.
    #[error("handle {handle} is a {actual} handle, operation requires {expected}")]
    InterfaceMismatch {
        handle: HandleId,
        expected: DeviceClass,
        actual: DeviceClass,
    },

    /// A control-plane device name did not match any device class.
    #[error("unknown device class '{0}'")]
    UnknownDeviceClass(String),

    /// A message arrived from a client the arbiter does not know (already disconnected).
    #[error("client {client} is not connected")]
    UnknownClient { client: ClientId },

    /// The arbiter task is gone; the channel to it is closed.
    #[error("seat arbiter is no longer running")]
    Disconnected,
}

/// Error type for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("Failed to read configuration file from {path:?}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML or does not match the schema.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Values parsed fine but are not acceptable.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Error type for logging initialization.
///
/// Filesystem failures while preparing a log file surface as [`CoreError::Filesystem`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoggingError {
    #[error("Failed to initialize logging: {0}")]
    InitializationFailure(String),
}

/// Umbrella error for seat start-up and runtime failures.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Configuration Error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logging Error: {0}")]
    Logging(#[from] LoggingError),

    #[error("Seat Error: {0}")]
    Seat(#[from] SeatError),

    /// Filesystem failure outside of configuration reading, e.g. creating a log directory.
    #[error("Filesystem Error: {message} (Path: {path:?})")]
    Filesystem {
        message: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn seat_error_messages_name_the_class() {
        let err = SeatError::NoDeviceOfClass { class: DeviceClass::Touch };
        assert_eq!(err.to_string(), "no touch device is registered on this seat");

        let err = SeatError::UseOfRevokedHandle {
            handle: HandleId::new(7),
            class: DeviceClass::Pointer,
        };
        assert_eq!(err.to_string(), "handle #7 (pointer) has been revoked; operation ignored");
    }

    #[test]
    fn core_error_wraps_config_error() {
        let core_err: CoreError = ConfigError::ValidationError("empty seat name".to_string()).into();
        assert_eq!(
            core_err.to_string(),
            "Configuration Error: Configuration validation failed: empty seat name"
        );
        assert!(core_err.source().is_some());
    }

    #[test]
    fn core_error_filesystem_keeps_io_source() {
        let core_err = CoreError::Filesystem {
            message: "cannot create log directory".to_string(),
            path: PathBuf::from("/nonexistent/logs"),
            source: IoError::new(ErrorKind::PermissionDenied, "denied"),
        };
        let source = core_err.source().and_then(|s| s.downcast_ref::<IoError>());
        assert_eq!(source.map(IoError::kind), Some(ErrorKind::PermissionDenied));
    }

    #[test]
    fn core_error_wraps_logging_error() {
        let core_err: CoreError = LoggingError::InitializationFailure("already set".to_string()).into();
        assert_eq!(core_err.to_string(), "Logging Error: Failed to initialize logging: already set");
        assert!(matches!(core_err, CoreError::Logging(LoggingError::InitializationFailure(_))));
    }

    #[test]
    fn core_error_from_seat_error() {
        let core_err: CoreError = SeatError::Disconnected.into();
        assert!(matches!(core_err, CoreError::Seat(SeatError::Disconnected)));
    }
}
