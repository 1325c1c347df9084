//! The seat arbiter: owner of the device registry and of every client's bound
//! device resources.
//!
//! The arbiter is a plain state machine. It is driven one [`ArbiterMessage`] at
//! a time (see [`crate::server`]), so registry mutations and bind requests are
//! linearized by arrival order and no locking is needed.
//!
//! Bind requests are answered against the *current* device counts, and every
//! bind gets an answer in order with the capability edges. A client may
//! legitimately ask for a class whose last device was removed a moment ago,
//! before the capability edge reached it. Such a request is not a protocol
//! error: the arbiter records an inert resource, tells the client the handle is
//! inert, and ignores further operations on it until it is released.

use std::collections::{BTreeMap, HashMap};
use std::ops::ControlFlow;
use tokio::sync::mpsc;

use crate::config::SeatConfig;
use crate::error::SeatError;
use crate::input::registry::DeviceRegistry;
use crate::input::seat::{DeviceClass, Notification, SeatCapability};
use crate::protocol::{ArbiterMessage, ClientId, Event, HandleId, HandleOp, Request};

/// Cursor state last set through `wl_pointer.set_cursor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorHotspot {
    pub serial: u32,
    pub x: i32,
    pub y: i32,
}

/// Server-side state of one bound handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundResource {
    pub class: DeviceClass,
    /// `false` once the class lost its last device, or if it had none at bind time.
    pub live: bool,
    /// Pointer resources only.
    pub cursor: Option<CursorHotspot>,
}

#[derive(Debug)]
struct ClientState {
    events: mpsc::UnboundedSender<Event>,
    resources: HashMap<HandleId, BoundResource>,
}

impl ClientState {
    fn post(&self, client: ClientId, event: Event) {
        if self.events.send(event).is_err() {
            // The connection is going away; its Disconnect is queued behind us.
            tracing::trace!(%client, "event dropped, client receiver closed");
        }
    }
}

/// Authority over one seat's devices and the resources clients bound on it.
#[derive(Debug)]
pub struct Arbiter {
    seat_name: String,
    registry: DeviceRegistry,
    clients: BTreeMap<ClientId, ClientState>,
}

impl Arbiter {
    /// Creates an arbiter for the seat `seat_name` with the given initial devices.
    pub fn new(seat_name: impl Into<String>, registry: DeviceRegistry) -> Self {
        Self { seat_name: seat_name.into(), registry, clients: BTreeMap::new() }
    }

    pub fn from_config(config: &SeatConfig) -> Self {
        Self::new(config.name.clone(), config.devices.registry())
    }

    pub fn seat_name(&self) -> &str {
        &self.seat_name
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn capability_bitmask(&self) -> SeatCapability {
        self.registry.capability_bitmask()
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn is_connected(&self, client: ClientId) -> bool {
        self.clients.contains_key(&client)
    }

    /// The resource `client` bound as `handle`, if it has not been released.
    pub fn resource(&self, client: ClientId, handle: HandleId) -> Option<&BoundResource> {
        self.clients.get(&client)?.resources.get(&handle)
    }

    /// Number of unreleased resources held by `client`.
    pub fn resource_count(&self, client: ClientId) -> usize {
        self.clients.get(&client).map_or(0, |state| state.resources.len())
    }

    /// Processes one inbound message. Returns `Break` on shutdown.
    ///
    /// Request errors are logged here and never travel back to the client.
    pub fn handle_message(&mut self, message: ArbiterMessage) -> ControlFlow<()> {
        match message {
            ArbiterMessage::Connect { client, events } => self.connect(client, events),
            ArbiterMessage::Disconnect { client } => self.disconnect(client),
            ArbiterMessage::Request { client, request } => {
                if let Err(err) = self.dispatch(client, request) {
                    log_rejected(client, &err);
                }
            }
            ArbiterMessage::Shutdown => {
                tracing::info!(seat = %self.seat_name, clients = self.clients.len(), "seat arbiter shutting down");
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Registers a client and sends it the seat name and current capabilities
    /// (the `wl_seat` bind sequence).
    pub fn connect(&mut self, client: ClientId, events: mpsc::UnboundedSender<Event>) {
        let state = ClientState { events, resources: HashMap::new() };
        state.post(client, Event::Name(self.seat_name.clone()));
        state.post(client, Event::Capabilities(self.registry.capability_bitmask()));
        if self.clients.insert(client, state).is_some() {
            tracing::warn!(%client, "client reconnected; previous resources dropped");
        }
        tracing::info!(seat = %self.seat_name, %client, "client connected");
    }

    /// Forgets a client and every resource it still held.
    pub fn disconnect(&mut self, client: ClientId) {
        match self.clients.remove(&client) {
            Some(state) => tracing::info!(
                seat = %self.seat_name,
                %client,
                leaked_resources = state.resources.len(),
                "client disconnected"
            ),
            None => tracing::debug!(%client, "disconnect for unknown client"),
        }
    }

    /// Executes one client request.
    ///
    /// # Errors
    /// The error describes why the request was dropped. Callers log it; it
    /// must never be turned into a protocol error for the peer.
    pub fn dispatch(&mut self, client: ClientId, request: Request) -> Result<(), SeatError> {
        match request {
            Request::AddDevice(class) => {
                self.add_device(class);
                Ok(())
            }
            Request::RemoveDevice(class) => self.remove_device(class),
            Request::Bind { class, handle } => self.bind(client, class, handle),
            Request::Op { handle, op } => self.apply_op(client, handle, op),
            Request::Release { handle } => self.release(client, handle),
            Request::Sync { callback } => {
                let state = self.client(client)?;
                state.post(client, Event::Done { callback });
                Ok(())
            }
        }
    }

    /// Plugs in one device of `class`, broadcasting the capability edge if there is one.
    pub fn add_device(&mut self, class: DeviceClass) {
        if let Some(notification) = self.registry.add(class) {
            tracing::info!(seat = %self.seat_name, %class, "capability gained");
            self.broadcast(notification);
        }
    }

    /// Unplugs one device of `class`.
    ///
    /// When the last device goes, every live resource of that class becomes
    /// inert and the capability edge is broadcast.
    ///
    /// # Errors
    /// [`SeatError::NoDeviceOfClass`] if there is nothing to remove.
    pub fn remove_device(&mut self, class: DeviceClass) -> Result<(), SeatError> {
        let Some(notification) = self.registry.remove(class)? else {
            return Ok(());
        };

        let mut revoked = 0usize;
        for state in self.clients.values_mut() {
            for resource in state.resources.values_mut() {
                if resource.class == class && resource.live {
                    resource.live = false;
                    revoked += 1;
                }
            }
        }
        tracing::info!(seat = %self.seat_name, %class, revoked, "capability lost");
        self.broadcast(notification);
        Ok(())
    }

    /// Handles `wl_seat.get_pointer` / `get_keyboard` / `get_touch`.
    ///
    /// # Arguments
    /// * `client`: The requesting client.
    /// * `class`: The device class asked for.
    /// * `handle`: The id the client already assigned to the new handle.
    fn bind(&mut self, client: ClientId, class: DeviceClass, handle: HandleId) -> Result<(), SeatError> {
        let live = self.registry.count(class) > 0;
        let state = self.client_mut(client)?;
        if state.resources.contains_key(&handle) {
            // Every bind gets an answer; the existing resource is left alone.
            state.post(client, Event::HandleInert { handle });
            return Err(SeatError::HandleInUse { handle });
        }
        state.resources.insert(handle, BoundResource { class, live, cursor: None });

        if live {
            tracing::debug!(%client, %handle, %class, "bound live resource");
            state.post(client, Event::HandleBound { handle });
        } else {
            tracing::debug!(%client, %handle, %class, "bind raced device removal; resource is inert");
            state.post(client, Event::HandleInert { handle });
        }
        Ok(())
    }

    fn apply_op(&mut self, client: ClientId, handle: HandleId, op: HandleOp) -> Result<(), SeatError> {
        let resource = self
            .client_mut(client)?
            .resources
            .get_mut(&handle)
            .ok_or(SeatError::UseAfterRelease { handle })?;
        if !resource.live {
            return Err(SeatError::UseOfRevokedHandle { handle, class: resource.class });
        }

        match op {
            HandleOp::SetCursor { serial, hotspot_x, hotspot_y } => {
                if resource.class != DeviceClass::Pointer {
                    return Err(SeatError::InterfaceMismatch {
                        handle,
                        expected: DeviceClass::Pointer,
                        actual: resource.class,
                    });
                }
                resource.cursor = Some(CursorHotspot { serial, x: hotspot_x, y: hotspot_y });
            }
        }
        Ok(())
    }

    /// Frees a resource. Device counts are not touched: binding and device
    /// presence are accounted separately.
    fn release(&mut self, client: ClientId, handle: HandleId) -> Result<(), SeatError> {
        let resource = self
            .client_mut(client)?
            .resources
            .remove(&handle)
            .ok_or(SeatError::UseAfterRelease { handle })?;
        tracing::debug!(%client, %handle, class = %resource.class, live = resource.live, "resource released");
        Ok(())
    }

    fn broadcast(&self, notification: Notification) {
        for (client, state) in &self.clients {
            state.post(*client, Event::CapabilityChanged(notification));
        }
    }

    fn client(&self, client: ClientId) -> Result<&ClientState, SeatError> {
        self.clients.get(&client).ok_or(SeatError::UnknownClient { client })
    }

    fn client_mut(&mut self, client: ClientId) -> Result<&mut ClientState, SeatError> {
        self.clients.get_mut(&client).ok_or(SeatError::UnknownClient { client })
    }
}

fn log_rejected(client: ClientId, err: &SeatError) {
    match err {
        SeatError::UseOfRevokedHandle { .. } | SeatError::UnknownClient { .. } => {
            tracing::debug!(%client, "request ignored: {err}")
        }
        _ => tracing::warn!(%client, "request dropped: {err}"),
    }
}
