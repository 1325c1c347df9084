//! Messages exchanged between clients and the seat arbiter.
//!
//! Transport is an ordered, reliable, single-consumer channel per direction:
//! every client shares the arbiter's inbound queue (so requests are processed in
//! arrival order) and owns a private outbound event queue.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

use crate::error::SeatError;
use crate::input::seat::{DeviceClass, Notification, SeatCapability};

/// Identifies one client connection to the arbiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl ClientId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Creates a new, process-unique `ClientId`.
    pub fn new_unique() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        ClientId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// Client-allocated id of a device handle, unique within one connection.
///
/// Like a Wayland `new_id`, the client picks it before the arbiter has seen
/// the bind request, so binding never waits for a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u32);

impl HandleId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Operations on a bound handle other than release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOp {
    /// `wl_pointer.set_cursor`; only valid on pointer handles.
    SetCursor { serial: u32, hotspot_x: i32, hotspot_y: i32 },
}

/// Client → arbiter requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Control plane: plug in one device of `class`.
    AddDevice(DeviceClass),
    /// Control plane: unplug one device of `class`.
    RemoveDevice(DeviceClass),
    /// `wl_seat.get_pointer` / `get_keyboard` / `get_touch`.
    Bind { class: DeviceClass, handle: HandleId },
    Op { handle: HandleId, op: HandleOp },
    Release { handle: HandleId },
    /// Barrier: answered with [`Event::Done`] once everything queued before it is processed.
    Sync { callback: u32 },
}

/// Arbiter → client events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Seat name, sent once on connect.
    Name(String),
    /// Capability snapshot, sent once on connect.
    Capabilities(SeatCapability),
    /// A capability edge caused by a device add/remove.
    CapabilityChanged(Notification),
    /// The bind for `handle` was answered while its class had devices.
    HandleBound { handle: HandleId },
    /// The bind for `handle` was answered while its class had no device.
    HandleInert { handle: HandleId },
    /// Answer to [`Request::Sync`].
    Done { callback: u32 },
}

/// Everything the arbiter task consumes, in arrival order.
#[derive(Debug)]
pub enum ArbiterMessage {
    Connect { client: ClientId, events: mpsc::UnboundedSender<Event> },
    Disconnect { client: ClientId },
    Request { client: ClientId, request: Request },
    Shutdown,
}

/// Client-side sending half bound to one connection.
#[derive(Debug, Clone)]
pub struct RequestSender {
    client: ClientId,
    tx: mpsc::UnboundedSender<ArbiterMessage>,
}

impl RequestSender {
    pub(crate) fn new(client: ClientId, tx: mpsc::UnboundedSender<ArbiterMessage>) -> Self {
        Self { client, tx }
    }

    pub fn client(&self) -> ClientId {
        self.client
    }

    /// Queues `request` for the arbiter.
    ///
    /// # Errors
    /// [`SeatError::Disconnected`] if the arbiter task has stopped.
    pub fn send(&self, request: Request) -> Result<(), SeatError> {
        self.tx
            .send(ArbiterMessage::Request { client: self.client, request })
            .map_err(|_| SeatError::Disconnected)
    }

    pub(crate) fn disconnect(&self) -> Result<(), SeatError> {
        self.tx
            .send(ArbiterMessage::Disconnect { client: self.client })
            .map_err(|_| SeatError::Disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_client_ids_differ() {
        assert_ne!(ClientId::new_unique(), ClientId::new_unique());
    }

    #[test]
    fn sender_tags_requests_with_client() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sender = RequestSender::new(ClientId::new(9), tx);

        sender.send(Request::Sync { callback: 3 }).expect("channel open");
        match rx.try_recv() {
            Ok(ArbiterMessage::Request { client, request }) => {
                assert_eq!(client, ClientId::new(9));
                assert_eq!(request, Request::Sync { callback: 3 });
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn send_after_arbiter_gone_reports_disconnected() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let sender = RequestSender::new(ClientId::new(1), tx);
        assert_eq!(sender.send(Request::AddDevice(DeviceClass::Touch)), Err(SeatError::Disconnected));
        assert_eq!(sender.disconnect(), Err(SeatError::Disconnected));
    }
}
