//! Client-side device handles (`wl_pointer`, `wl_keyboard`, `wl_touch` proxies).
//!
//! A [`DeviceHandle`] is owned by whoever bound it. The owning
//! [`CapabilityMirror`](crate::input::mirror::CapabilityMirror) keeps only a weak
//! reference to the handle's state so it can apply the arbiter's answer to the
//! bind and revoke the handle when the class disappears. Revocation makes the
//! handle unusable but does not free it: the owner still has to release it,
//! either by calling [`DeviceHandle::release`] or by dropping it.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::error::SeatError;
use crate::input::seat::DeviceClass;
use crate::protocol::{HandleId, HandleOp, Request, RequestSender};

/// Validity of a handle as seen by its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HandleState {
    /// Bind sent; the arbiter has not answered yet.
    Pending = 0,
    /// The arbiter bound it to an available class.
    Live = 1,
    /// The capability was withdrawn (or never present at bind time); only release is meaningful.
    Revoked = 2,
    /// Released by its owner.
    Released = 3,
}

impl HandleState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => HandleState::Pending,
            1 => HandleState::Live,
            2 => HandleState::Revoked,
            _ => HandleState::Released,
        }
    }
}

/// State shared between a handle and the mirror that issued it.
#[derive(Debug)]
pub(crate) struct HandleCell {
    state: AtomicU8,
}

impl HandleCell {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self { state: AtomicU8::new(HandleState::Pending as u8) })
    }

    pub(crate) fn state(&self) -> HandleState {
        HandleState::from_raw(self.state.load(Ordering::Acquire))
    }

    /// Applies the arbiter's answer to the bind: Pending → Live or Revoked.
    /// Returns `true` if this call performed the transition.
    pub(crate) fn acknowledge(&self, live: bool) -> bool {
        let next = if live { HandleState::Live } else { HandleState::Revoked };
        self.transition(HandleState::Pending, next)
    }

    /// Live → Revoked. Returns `true` if this call performed the transition.
    ///
    /// Pending handles are left alone; their acknowledgement decides.
    pub(crate) fn revoke(&self) -> bool {
        self.transition(HandleState::Live, HandleState::Revoked)
    }

    fn transition(&self, from: HandleState, to: HandleState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Moves to Released and returns the previous state.
    fn mark_released(&self) -> HandleState {
        HandleState::from_raw(self.state.swap(HandleState::Released as u8, Ordering::AcqRel))
    }
}

/// A bound, revocable interface to one device class.
///
/// Not `Clone`: exactly one owner can release it, so a release reaches the
/// arbiter at most once per bind.
#[derive(Debug)]
pub struct DeviceHandle {
    id: HandleId,
    class: DeviceClass,
    cell: Arc<HandleCell>,
    requests: RequestSender,
}

impl DeviceHandle {
    pub(crate) fn new(id: HandleId, class: DeviceClass, cell: Arc<HandleCell>, requests: RequestSender) -> Self {
        Self { id, class, cell, requests }
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn class(&self) -> DeviceClass {
        self.class
    }

    pub fn state(&self) -> HandleState {
        self.cell.state()
    }

    /// `true` once the arbiter has bound the handle to an available class,
    /// until the class goes away.
    pub fn is_valid(&self) -> bool {
        self.state() == HandleState::Live
    }

    /// Sets the cursor image hotspot (`wl_pointer.set_cursor`).
    ///
    /// On a revoked handle the request is dropped locally and `Ok(())` is
    /// returned. A pending handle forwards the request and the arbiter decides:
    /// if the resource turned out inert, it ignores the request.
    ///
    /// # Errors
    /// - [`SeatError::InterfaceMismatch`] if this is not a pointer handle.
    /// - [`SeatError::Disconnected`] if the arbiter is gone.
    pub fn set_cursor(&self, serial: u32, hotspot_x: i32, hotspot_y: i32) -> Result<(), SeatError> {
        if self.class != DeviceClass::Pointer {
            return Err(SeatError::InterfaceMismatch {
                handle: self.id,
                expected: DeviceClass::Pointer,
                actual: self.class,
            });
        }
        self.send_op(HandleOp::SetCursor { serial, hotspot_x, hotspot_y })
    }

    /// Releases the handle (`wl_pointer.release` and friends).
    ///
    /// Always succeeds, including on revoked handles.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn send_op(&self, op: HandleOp) -> Result<(), SeatError> {
        match self.state() {
            HandleState::Pending | HandleState::Live => self.requests.send(Request::Op { handle: self.id, op }),
            HandleState::Revoked => {
                let err = SeatError::UseOfRevokedHandle { handle: self.id, class: self.class };
                tracing::debug!(client = %self.requests.client(), "{err}");
                Ok(())
            }
            // Only reachable if the mirror's bookkeeping and this handle disagree.
            HandleState::Released => Err(SeatError::UseAfterRelease { handle: self.id }),
        }
    }

    fn release_inner(&mut self) {
        if self.cell.mark_released() == HandleState::Released {
            return;
        }
        tracing::debug!(client = %self.requests.client(), handle = %self.id, class = %self.class, "releasing handle");
        if self.requests.send(Request::Release { handle: self.id }).is_err() {
            tracing::debug!(handle = %self.id, "arbiter gone; release not delivered");
        }
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        self.release_inner();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ArbiterMessage, ClientId};
    use static_assertions::{assert_impl_all, assert_not_impl_any};
    use tokio::sync::mpsc;

    assert_impl_all!(DeviceHandle: Send, Sync);
    assert_not_impl_any!(DeviceHandle: Clone, Copy);

    fn handle(class: DeviceClass) -> (DeviceHandle, Arc<HandleCell>, mpsc::UnboundedReceiver<ArbiterMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let cell = HandleCell::new();
        let requests = RequestSender::new(ClientId::new(1), tx);
        (DeviceHandle::new(HandleId::new(5), class, cell.clone(), requests), cell, rx)
    }

    fn requests(rx: &mut mpsc::UnboundedReceiver<ArbiterMessage>) -> Vec<Request> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            if let ArbiterMessage::Request { request, .. } = msg {
                out.push(request);
            }
        }
        out
    }

    #[test]
    fn pending_and_live_pointers_forward_set_cursor() {
        let (pointer, cell, mut rx) = handle(DeviceClass::Pointer);
        assert_eq!(pointer.state(), HandleState::Pending);
        assert!(!pointer.is_valid());
        pointer.set_cursor(10, 0, 0).expect("pending handle");

        assert!(cell.acknowledge(true));
        assert!(pointer.is_valid());
        pointer.set_cursor(11, 2, 3).expect("live handle");

        let ops: Vec<_> = requests(&mut rx)
            .into_iter()
            .map(|request| match request {
                Request::Op { op: HandleOp::SetCursor { serial, .. }, .. } => serial,
                other => panic!("unexpected request: {other:?}"),
            })
            .collect();
        assert_eq!(ops, vec![10, 11]);
    }

    #[test]
    fn revoke_only_applies_to_acknowledged_handles() {
        let (_pointer, cell, _rx) = handle(DeviceClass::Pointer);
        assert!(!cell.revoke(), "pending handles wait for their own answer");
        assert_eq!(cell.state(), HandleState::Pending);

        assert!(cell.acknowledge(false));
        assert_eq!(cell.state(), HandleState::Revoked);
        assert!(!cell.acknowledge(true), "answers apply once");
    }

    #[test]
    fn revoked_handle_swallows_ops_but_still_releases() {
        let (pointer, cell, mut rx) = handle(DeviceClass::Pointer);
        assert!(cell.acknowledge(true));
        assert!(cell.revoke());
        assert!(!cell.revoke(), "second revoke is not a transition");
        assert_eq!(pointer.state(), HandleState::Revoked);

        assert_eq!(pointer.set_cursor(1, 0, 0), Ok(()));
        pointer.release();

        assert_eq!(requests(&mut rx), vec![Request::Release { handle: HandleId::new(5) }]);
        assert_eq!(cell.state(), HandleState::Released);
    }

    #[test]
    fn set_cursor_on_keyboard_is_a_mismatch() {
        let (keyboard, _cell, mut rx) = handle(DeviceClass::Keyboard);
        assert_eq!(
            keyboard.set_cursor(0, 0, 0),
            Err(SeatError::InterfaceMismatch {
                handle: HandleId::new(5),
                expected: DeviceClass::Pointer,
                actual: DeviceClass::Keyboard,
            })
        );
        drop(keyboard);
        assert_eq!(requests(&mut rx), vec![Request::Release { handle: HandleId::new(5) }]);
    }

    #[test]
    fn drop_releases_exactly_once() {
        let (touch, _cell, mut rx) = handle(DeviceClass::Touch);
        drop(touch);
        assert_eq!(requests(&mut rx).len(), 1);
    }

    #[test]
    fn release_after_arbiter_gone_does_not_panic() {
        let (touch, _cell, rx) = handle(DeviceClass::Touch);
        drop(rx);
        touch.release();
    }
}
