//! Seat input capability core.
//!
//! - [`seat`]: device classes, the capability bitmask and edge notifications.
//! - [`registry`]: per-class device counters kept by the arbiter.
//! - [`arbiter`]: serializes hotplug and bind requests and owns server-side resources.
//! - [`mirror`]: a client's view of the seat, applied in event order.
//! - [`handle`]: owned, revocable device handles.

pub mod arbiter;
pub mod handle;
pub mod mirror;
pub mod registry;
pub mod seat;

pub use arbiter::{Arbiter, BoundResource, CursorHotspot};
pub use handle::{DeviceHandle, HandleState};
pub use mirror::CapabilityMirror;
pub use registry::DeviceRegistry;
pub use seat::{DeviceClass, Notification, SeatCapability};
