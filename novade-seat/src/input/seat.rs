//! Seat vocabulary: device classes, the `wl_seat` capability bitmask and the
//! capability-change notification pushed to every bound client.

use bitflags::bitflags;
use std::fmt;
use std::str::FromStr;

use crate::error::SeatError;

/// One of the three input device kinds a seat can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceClass {
    Pointer,
    Keyboard,
    Touch,
}

impl DeviceClass {
    /// Every class, in arena order.
    pub const ALL: [DeviceClass; 3] = [DeviceClass::Pointer, DeviceClass::Keyboard, DeviceClass::Touch];

    /// Slot of this class in per-class arenas.
    pub const fn index(self) -> usize {
        match self {
            DeviceClass::Pointer => 0,
            DeviceClass::Keyboard => 1,
            DeviceClass::Touch => 2,
        }
    }

    /// The capability bit advertised while at least one device of this class exists.
    pub const fn capability(self) -> SeatCapability {
        match self {
            DeviceClass::Pointer => SeatCapability::Pointer,
            DeviceClass::Keyboard => SeatCapability::Keyboard,
            DeviceClass::Touch => SeatCapability::Touch,
        }
    }

    /// Control-plane name of the class (`"pointer"`, `"keyboard"`, `"touch"`).
    pub const fn name(self) -> &'static str {
        match self {
            DeviceClass::Pointer => "pointer",
            DeviceClass::Keyboard => "keyboard",
            DeviceClass::Touch => "touch",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DeviceClass {
    type Err = SeatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        DeviceClass::ALL
            .into_iter()
            .find(|class| class.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| SeatError::UnknownDeviceClass(trimmed.to_string()))
    }
}

bitflags! {
    /// Represents the capabilities of a `wl_seat`.
    ///
    /// Values match the `wl_seat.capabilities` wire encoding.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SeatCapability: u32 {
        /// The seat has pointer devices (e.g., a mouse).
        const Pointer = 1;
        /// The seat has keyboard devices.
        const Keyboard = 2;
        /// The seat has touch devices.
        const Touch = 4;
    }
}

impl SeatCapability {
    /// Whether the bit for `class` is set.
    pub fn has(self, class: DeviceClass) -> bool {
        self.contains(class.capability())
    }

    /// The classes whose bits are set, in arena order.
    pub fn classes(self) -> impl Iterator<Item = DeviceClass> {
        DeviceClass::ALL.into_iter().filter(move |class| self.has(*class))
    }
}

impl From<DeviceClass> for SeatCapability {
    fn from(class: DeviceClass) -> Self {
        class.capability()
    }
}

/// A capability edge: `class` changed availability and the seat now advertises `capabilities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    pub class: DeviceClass,
    pub capabilities: SeatCapability,
}

impl Notification {
    /// `true` if `class` became available, `false` if it was withdrawn.
    pub fn is_rising(&self) -> bool {
        self.capabilities.has(self.class)
    }
}
