//! Per-class device accounting on the arbiter side.
//!
//! The registry does not know about individual devices. It keeps one counter
//! per [`DeviceClass`] and reports a [`Notification`] whenever a counter
//! crosses zero in either direction.

use crate::error::SeatError;
use crate::input::seat::{DeviceClass, Notification, SeatCapability};

/// Authoritative device counts for one seat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceRegistry {
    counts: [u64; 3],
}

impl DeviceRegistry {
    /// Creates a registry with no devices.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry seeded with the devices present at seat start-up.
    pub fn with_counts(pointer: u64, keyboard: u64, touch: u64) -> Self {
        Self { counts: [pointer, keyboard, touch] }
    }

    /// Number of devices of `class` currently registered.
    pub fn count(&self, class: DeviceClass) -> u64 {
        self.counts[class.index()]
    }

    /// Registers one more device of `class`.
    ///
    /// Returns the rising-edge notification if this is the first device of its class.
    pub fn add(&mut self, class: DeviceClass) -> Option<Notification> {
        let slot = &mut self.counts[class.index()];
        *slot += 1;
        tracing::trace!(%class, count = *slot, "device added");
        (*slot == 1).then(|| self.notification(class))
    }

    /// Unregisters one device of `class`.
    ///
    /// Returns the falling-edge notification if this was the last device of its class.
    ///
    /// # Errors
    /// [`SeatError::NoDeviceOfClass`] if no device of `class` is registered; the
    /// registry is left untouched.
    pub fn remove(&mut self, class: DeviceClass) -> Result<Option<Notification>, SeatError> {
        let slot = &mut self.counts[class.index()];
        if *slot == 0 {
            return Err(SeatError::NoDeviceOfClass { class });
        }
        *slot -= 1;
        tracing::trace!(%class, count = *slot, "device removed");
        Ok((*slot == 0).then(|| self.notification(class)))
    }

    /// The set of classes with at least one device.
    pub fn capability_bitmask(&self) -> SeatCapability {
        DeviceClass::ALL
            .into_iter()
            .filter(|class| self.count(*class) > 0)
            .fold(SeatCapability::empty(), |caps, class| caps | class.capability())
    }

    fn notification(&self, class: DeviceClass) -> Notification {
        Notification { class, capabilities: self.capability_bitmask() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn first_add_is_a_rising_edge() {
        let mut registry = DeviceRegistry::new();
        assert_eq!(registry.capability_bitmask(), SeatCapability::empty());

        let edge = registry.add(DeviceClass::Keyboard);
        assert_eq!(
            edge,
            Some(Notification { class: DeviceClass::Keyboard, capabilities: SeatCapability::Keyboard })
        );
        assert_eq!(registry.add(DeviceClass::Keyboard), None);
        assert_eq!(registry.count(DeviceClass::Keyboard), 2);
    }

    #[test]
    fn last_remove_is_a_falling_edge() {
        let mut registry = DeviceRegistry::with_counts(2, 1, 0);

        assert_eq!(registry.remove(DeviceClass::Pointer), Ok(None));
        assert!(registry.capability_bitmask().has(DeviceClass::Pointer));

        let edge = registry.remove(DeviceClass::Pointer);
        assert_eq!(
            edge,
            Ok(Some(Notification { class: DeviceClass::Pointer, capabilities: SeatCapability::Keyboard }))
        );
        assert!(!registry.capability_bitmask().has(DeviceClass::Pointer));
    }

    #[test]
    fn remove_without_device_fails_and_leaves_state() {
        let mut registry = DeviceRegistry::with_counts(1, 0, 1);
        let before = registry.clone();

        assert_eq!(
            registry.remove(DeviceClass::Keyboard),
            Err(SeatError::NoDeviceOfClass { class: DeviceClass::Keyboard })
        );
        assert_eq!(registry, before);
    }

    #[test]
    fn bounce_reports_both_edges() {
        let mut registry = DeviceRegistry::new();
        let up = registry.add(DeviceClass::Touch);
        let down = registry.remove(DeviceClass::Touch).ok().flatten();
        assert!(up.is_some_and(|n| n.is_rising()));
        assert!(down.is_some_and(|n| !n.is_rising()));
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(15)]
    #[case(30)]
    fn interleaved_bursts_restore_counts(#[case] n: u64) {
        let mut registry = DeviceRegistry::with_counts(1, 1, 1);
        let before = registry.clone();

        for _ in 0..n {
            for class in DeviceClass::ALL {
                registry.add(class);
            }
        }
        for _ in 0..n {
            for class in DeviceClass::ALL {
                assert!(registry.remove(class).is_ok());
            }
        }

        assert_eq!(registry, before);
        assert_eq!(registry.capability_bitmask(), SeatCapability::all());
    }

    #[test]
    fn bitmask_tracks_nonzero_counts() {
        let mut registry = DeviceRegistry::new();
        let script = [
            (DeviceClass::Pointer, true),
            (DeviceClass::Touch, true),
            (DeviceClass::Pointer, true),
            (DeviceClass::Pointer, false),
            (DeviceClass::Touch, false),
            (DeviceClass::Keyboard, true),
        ];
        for (class, add) in script {
            if add {
                registry.add(class);
            } else {
                registry.remove(class).expect("device present");
            }
            for other in DeviceClass::ALL {
                assert_eq!(registry.capability_bitmask().has(other), registry.count(other) > 0);
            }
        }
        assert_eq!(registry.capability_bitmask(), SeatCapability::Pointer | SeatCapability::Keyboard);
    }
}
