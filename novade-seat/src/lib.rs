//! # NovaDE Seat (`novade-seat`)
//!
//! Capability negotiation for a `wl_seat`: which of pointer, keyboard and
//! touch a seat currently offers, how clients learn about changes, and what
//! happens to device handles when the hardware behind them disappears.
//!
//! - The [`Arbiter`](input::Arbiter) counts devices per class and broadcasts
//!   a notification every time a class count crosses zero.
//! - Each client keeps a [`CapabilityMirror`](input::CapabilityMirror) that
//!   applies those notifications in order and binds
//!   [`DeviceHandle`](input::DeviceHandle)s.
//! - A bind that races the removal of the last device of its class yields an
//!   inert handle instead of a protocol error. Inert and revoked handles can
//!   always be released.
//!
//! ```rust,ignore
//! use novade_seat::config::ConfigLoader;
//! use novade_seat::input::DeviceClass;
//! use novade_seat::server::SeatServer;
//!
//! let config = ConfigLoader::load()?;
//! novade_seat::logging::init_logging(&config.logging)?;
//!
//! let server = SeatServer::spawn(&config);
//! let mut client = server.connect()?;
//! client.roundtrip().await?;
//!
//! client.remove_device(DeviceClass::Pointer)?;
//! let pointer = client.bind(DeviceClass::Pointer)?;
//! client.roundtrip().await?;
//! assert!(!pointer.is_valid());
//! pointer.release();
//! ```

pub mod config;
pub mod error;
pub mod input;
pub mod logging;
pub mod protocol;
pub mod server;

pub use config::{ConfigLoader, SeatConfig};
pub use error::{ConfigError, CoreError, LoggingError, SeatError};
pub use input::{
    Arbiter, CapabilityMirror, DeviceClass, DeviceHandle, DeviceRegistry, HandleState, Notification, SeatCapability,
};
pub use logging::{init_logging, init_minimal_logging};
pub use protocol::{ClientId, Event, HandleId, Request};
pub use server::{ClientConnection, SeatServer};
