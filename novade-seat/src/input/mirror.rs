//! Client-side mirror of a seat's capabilities.
//!
//! The mirror applies arbiter events strictly in arrival order. It keeps
//! - the last advertised [`SeatCapability`] bitmask,
//! - one optional held handle per class (the "current" pointer/keyboard/touch),
//! - weak references to every handle it issued, so bind answers and withdrawn
//!   classes can reach them,
//! - an ordered log of applied capability edges for observers.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use crate::error::SeatError;
use crate::input::handle::{DeviceHandle, HandleCell, HandleState};
use crate::input::seat::{DeviceClass, Notification, SeatCapability};
use crate::protocol::{Event, HandleId, Request, RequestSender};

#[derive(Debug)]
struct IssuedHandle {
    class: DeviceClass,
    cell: Weak<HandleCell>,
}

/// Mirror of one seat as seen by one client connection.
#[derive(Debug)]
pub struct CapabilityMirror {
    requests: RequestSender,
    seat_name: Option<String>,
    capabilities: SeatCapability,
    slots: [Option<DeviceHandle>; 3],
    issued: HashMap<HandleId, IssuedHandle>,
    changes: Vec<Notification>,
    next_handle: u32,
    auto_bind: bool,
}

impl CapabilityMirror {
    /// Creates an empty mirror.
    ///
    /// With `auto_bind`, the mirror binds a handle into the class slot whenever
    /// a class becomes available and the slot is empty.
    pub fn new(requests: RequestSender, auto_bind: bool) -> Self {
        Self {
            requests,
            seat_name: None,
            capabilities: SeatCapability::empty(),
            slots: [None, None, None],
            issued: HashMap::new(),
            changes: Vec::new(),
            next_handle: 1,
            auto_bind,
        }
    }

    pub fn capabilities(&self) -> SeatCapability {
        self.capabilities
    }

    pub fn seat_name(&self) -> Option<&str> {
        self.seat_name.as_deref()
    }

    /// The handle held in the slot for `class`, valid or revoked.
    pub fn handle(&self, class: DeviceClass) -> Option<&DeviceHandle> {
        self.slots[class.index()].as_ref()
    }

    /// Moves the slot handle for `class` out to the caller.
    pub fn take_handle(&mut self, class: DeviceClass) -> Option<DeviceHandle> {
        self.slots[class.index()].take()
    }

    /// Binds `class` and stores the handle in its slot, releasing whatever was there.
    pub fn acquire(&mut self, class: DeviceClass) -> Result<&DeviceHandle, SeatError> {
        let handle = self.bind(class)?;
        let slot = &mut self.slots[class.index()];
        if let Some(previous) = slot.take() {
            previous.release();
        }
        Ok(slot.insert(handle))
    }

    /// Sends a bind request for `class` and returns the new handle without waiting.
    ///
    /// The handle stays [`HandleState::Pending`] until the arbiter answers with
    /// [`Event::HandleBound`] or [`Event::HandleInert`], decided against its
    /// own device counts at the time it processes the request.
    pub fn bind(&mut self, class: DeviceClass) -> Result<DeviceHandle, SeatError> {
        self.prune();
        let id = self.allocate_id();
        self.requests.send(Request::Bind { class, handle: id })?;

        let cell = HandleCell::new();
        self.issued.insert(id, IssuedHandle { class, cell: Arc::downgrade(&cell) });
        tracing::debug!(client = %self.requests.client(), handle = %id, %class, "bind requested");
        Ok(DeviceHandle::new(id, class, cell, self.requests.clone()))
    }

    /// Releases the slot handle for `class`.
    ///
    /// Safe on revoked handles; an empty slot is a no-op.
    pub fn release(&mut self, class: DeviceClass) {
        match self.slots[class.index()].take() {
            Some(handle) => handle.release(),
            None => tracing::debug!(client = %self.requests.client(), %class, "release on empty slot ignored"),
        }
    }

    /// Applies one arbiter event. Returns the callback id for [`Event::Done`].
    pub fn on_event(&mut self, event: Event) -> Option<u32> {
        match event {
            Event::Name(name) => {
                tracing::debug!(client = %self.requests.client(), seat = %name, "seat name");
                self.seat_name = Some(name);
            }
            Event::Capabilities(snapshot) => self.on_snapshot(snapshot),
            Event::CapabilityChanged(notification) => {
                self.on_notification(notification.class, notification.capabilities)
            }
            Event::HandleBound { handle } => self.acknowledge_bind(handle, true),
            Event::HandleInert { handle } => self.acknowledge_bind(handle, false),
            Event::Done { callback } => return Some(callback),
        }
        None
    }

    /// Applies a capability edge for `class`.
    pub fn on_notification(&mut self, class: DeviceClass, capabilities: SeatCapability) {
        tracing::debug!(
            client = %self.requests.client(),
            %class,
            capabilities = capabilities.bits(),
            "capabilities changed"
        );
        self.capabilities = capabilities;
        self.changes.push(Notification { class, capabilities });

        if capabilities.has(class) {
            self.auto_acquire(class);
        } else {
            self.revoke_class(class);
        }
    }

    /// Returns and clears the capability edges applied since the last call.
    pub fn drain_changes(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.changes)
    }

    /// `true` while some issued handle still waits for the arbiter's answer.
    pub fn has_pending(&self) -> bool {
        self.issued
            .values()
            .filter_map(|issued| issued.cell.upgrade())
            .any(|cell| cell.state() == HandleState::Pending)
    }

    /// Releases every slot handle.
    pub fn release_all(&mut self) {
        for class in DeviceClass::ALL {
            if let Some(handle) = self.slots[class.index()].take() {
                handle.release();
            }
        }
    }

    fn on_snapshot(&mut self, snapshot: SeatCapability) {
        self.capabilities = snapshot;
        for class in DeviceClass::ALL {
            if snapshot.has(class) {
                self.auto_acquire(class);
            } else {
                self.revoke_class(class);
            }
        }
    }

    fn auto_acquire(&mut self, class: DeviceClass) {
        if !self.auto_bind || self.slots[class.index()].is_some() {
            return;
        }
        match self.bind(class) {
            Ok(handle) => self.slots[class.index()] = Some(handle),
            Err(err) => tracing::warn!(client = %self.requests.client(), %class, "auto-bind failed: {err}"),
        }
    }

    /// Revokes acknowledged handles of `class`. Pending handles are answered
    /// after this edge, against the counts the arbiter has at that point.
    fn revoke_class(&mut self, class: DeviceClass) {
        for (id, issued) in &self.issued {
            if issued.class != class {
                continue;
            }
            if let Some(cell) = issued.cell.upgrade() {
                if cell.revoke() {
                    tracing::debug!(client = %self.requests.client(), handle = %id, %class, "handle revoked");
                }
            }
        }
        self.prune();
    }

    fn acknowledge_bind(&mut self, handle: HandleId, live: bool) {
        let cell = self.issued.get(&handle).and_then(|issued| issued.cell.upgrade());
        match cell {
            Some(cell) => {
                if cell.acknowledge(live) {
                    tracing::debug!(client = %self.requests.client(), %handle, live, "bind answered");
                }
            }
            None => tracing::trace!(%handle, live, "bind answer for a handle already released"),
        }
    }

    /// Next id not held by an unreleased handle. Id 0 is never used.
    fn allocate_id(&mut self) -> HandleId {
        loop {
            let id = HandleId::new(self.next_handle);
            self.next_handle = self.next_handle.checked_add(1).unwrap_or(1);
            if id.raw() != 0 && !self.issued.contains_key(&id) {
                return id;
            }
        }
    }

    /// Forgets handles that have been released or dropped.
    fn prune(&mut self) {
        self.issued.retain(|_, issued| {
            issued
                .cell
                .upgrade()
                .is_some_and(|cell| cell.state() != HandleState::Released)
        });
    }
}
