//! Runs an [`Arbiter`] on a tokio task and connects clients to it.
//!
//! Every client shares the arbiter's inbound queue, so the arbiter sees
//! requests from all clients in one total order. Each client gets its own
//! event queue, drained into its [`CapabilityMirror`] by
//! [`ClientConnection::roundtrip`] or [`ClientConnection::dispatch_pending`].

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::SeatConfig;
use crate::error::SeatError;
use crate::input::{Arbiter, CapabilityMirror, DeviceClass, DeviceHandle, Notification, SeatCapability};
use crate::protocol::{ArbiterMessage, ClientId, Event, Request, RequestSender};

/// A running seat arbiter.
#[derive(Debug)]
pub struct SeatServer {
    tx: mpsc::UnboundedSender<ArbiterMessage>,
    task: Option<JoinHandle<Arbiter>>,
    auto_bind: bool,
}

impl SeatServer {
    /// Spawns the arbiter for `config` on the current tokio runtime.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime, like [`tokio::spawn`].
    pub fn spawn(config: &SeatConfig) -> Self {
        Self::spawn_arbiter(Arbiter::from_config(config), config.auto_bind)
    }

    /// Spawns an already constructed arbiter. `auto_bind` applies to mirrors of
    /// clients connected through this server.
    pub fn spawn_arbiter(mut arbiter: Arbiter, auto_bind: bool) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tracing::info!(seat = %arbiter.seat_name(), capabilities = arbiter.capability_bitmask().bits(), "seat arbiter started");

        let task = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                if arbiter.handle_message(message).is_break() {
                    break;
                }
            }
            arbiter
        });
        Self { tx, task: Some(task), auto_bind }
    }

    /// Opens a new client connection.
    ///
    /// The seat name and capability snapshot are queued immediately; call
    /// [`ClientConnection::roundtrip`] to apply them.
    ///
    /// # Errors
    /// [`SeatError::Disconnected`] if the arbiter has stopped.
    pub fn connect(&self) -> Result<ClientConnection, SeatError> {
        let client = ClientId::new_unique();
        let (events_tx, events) = mpsc::unbounded_channel();
        self.tx
            .send(ArbiterMessage::Connect { client, events: events_tx })
            .map_err(|_| SeatError::Disconnected)?;

        let requests = RequestSender::new(client, self.tx.clone());
        Ok(ClientConnection {
            mirror: CapabilityMirror::new(requests.clone(), self.auto_bind),
            requests,
            events,
            next_callback: 1,
        })
    }

    /// Stops the arbiter after everything queued so far and returns its final state.
    ///
    /// # Errors
    /// [`SeatError::Disconnected`] if the arbiter task already ended abnormally.
    pub async fn shutdown(mut self) -> Result<Arbiter, SeatError> {
        let task = self.task.take().ok_or(SeatError::Disconnected)?;
        // A closed channel means the task already finished; joining still yields the arbiter.
        let _ = self.tx.send(ArbiterMessage::Shutdown);
        task.await.map_err(|e| {
            tracing::error!("seat arbiter task failed: {e}");
            SeatError::Disconnected
        })
    }
}

impl Drop for SeatServer {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.tx.send(ArbiterMessage::Shutdown);
        }
    }
}

/// One client's connection: its mirror, its event queue and its request sender.
///
/// Dropping the connection releases the handles held in the mirror's slots and
/// disconnects from the arbiter.
#[derive(Debug)]
pub struct ClientConnection {
    mirror: CapabilityMirror,
    requests: RequestSender,
    events: mpsc::UnboundedReceiver<Event>,
    next_callback: u32,
}

impl ClientConnection {
    pub fn id(&self) -> ClientId {
        self.requests.client()
    }

    pub fn mirror(&self) -> &CapabilityMirror {
        &self.mirror
    }

    pub fn mirror_mut(&mut self) -> &mut CapabilityMirror {
        &mut self.mirror
    }

    pub fn capabilities(&self) -> SeatCapability {
        self.mirror.capabilities()
    }

    pub fn seat_name(&self) -> Option<&str> {
        self.mirror.seat_name()
    }

    /// See [`CapabilityMirror::bind`].
    pub fn bind(&mut self, class: DeviceClass) -> Result<DeviceHandle, SeatError> {
        self.mirror.bind(class)
    }

    /// See [`CapabilityMirror::acquire`].
    pub fn acquire(&mut self, class: DeviceClass) -> Result<&DeviceHandle, SeatError> {
        self.mirror.acquire(class)
    }

    pub fn handle(&self, class: DeviceClass) -> Option<&DeviceHandle> {
        self.mirror.handle(class)
    }

    pub fn take_handle(&mut self, class: DeviceClass) -> Option<DeviceHandle> {
        self.mirror.take_handle(class)
    }

    /// Releases the slot handle for `class`, if any.
    pub fn release(&mut self, class: DeviceClass) {
        self.mirror.release(class)
    }

    /// Control plane: plug in a device of `class`.
    pub fn add_device(&self, class: DeviceClass) -> Result<(), SeatError> {
        self.requests.send(Request::AddDevice(class))
    }

    /// Control plane: unplug a device of `class`.
    ///
    /// Removing a class with no devices is dropped by the arbiter; the caller is not told.
    pub fn remove_device(&self, class: DeviceClass) -> Result<(), SeatError> {
        self.requests.send(Request::RemoveDevice(class))
    }

    /// Control plane by name (`"pointer"`, `"keyboard"`, `"touch"`).
    ///
    /// # Errors
    /// [`SeatError::UnknownDeviceClass`] for any other name; nothing is sent.
    pub fn add_device_named(&self, name: &str) -> Result<(), SeatError> {
        self.add_device(name.parse()?)
    }

    pub fn remove_device_named(&self, name: &str) -> Result<(), SeatError> {
        self.remove_device(name.parse()?)
    }

    /// Waits until the arbiter has processed everything this client sent so far
    /// and the mirror has applied every event that resulted.
    ///
    /// Binds the mirror issues while applying those events (auto-bind on a
    /// rising edge) are waited for as well, so no handle is left pending.
    ///
    /// # Errors
    /// [`SeatError::Disconnected`] if the arbiter goes away first.
    pub async fn roundtrip(&mut self) -> Result<(), SeatError> {
        loop {
            self.sync().await?;
            if !self.mirror.has_pending() {
                return Ok(());
            }
        }
    }

    async fn sync(&mut self) -> Result<(), SeatError> {
        let callback = self.next_callback;
        self.next_callback = self.next_callback.wrapping_add(1);
        self.requests.send(Request::Sync { callback })?;

        while let Some(event) = self.events.recv().await {
            if self.mirror.on_event(event) == Some(callback) {
                return Ok(());
            }
        }
        Err(SeatError::Disconnected)
    }

    /// Applies events that have already arrived without waiting. Returns how many.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events.try_recv() {
            self.mirror.on_event(event);
            applied += 1;
        }
        applied
    }

    /// See [`CapabilityMirror::drain_changes`].
    pub fn drain_changes(&mut self) -> Vec<Notification> {
        self.mirror.drain_changes()
    }
}

impl Drop for ClientConnection {
    fn drop(&mut self) {
        self.mirror.release_all();
        if self.requests.disconnect().is_err() {
            tracing::trace!(client = %self.requests.client(), "arbiter gone before disconnect");
        }
    }
}
