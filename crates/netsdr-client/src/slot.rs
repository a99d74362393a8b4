//! Single-slot response correlation.
//!
//! The wire carries no request id, so the next control message after a
//! request is taken as its response. [`ResponseSlot`] holds at most one
//! waiting sender; installing while occupied is refused.

use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio::sync::oneshot;

use crate::error::{ClientError, Result};

/// Receiving end of an installed request.
#[derive(Debug)]
pub struct PendingResponse {
    id: u64,
    rx: oneshot::Receiver<Bytes>,
}

impl PendingResponse {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the response. Fails with `Disconnected` if the slot is
    /// cleared first.
    pub async fn recv(self) -> Result<Bytes> {
        self.rx.await.map_err(|_| ClientError::Disconnected)
    }
}

/// Outcome of offering an inbound message to the slot.
#[derive(Debug, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to the waiting request.
    Resolved,
    /// A request was installed but its waiter has gone away.
    Abandoned,
    /// Nothing was waiting; the message is unsolicited.
    Unclaimed(Bytes),
}

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    waiting: Option<(u64, oneshot::Sender<Bytes>)>,
}

#[derive(Debug, Default)]
pub struct ResponseSlot {
    inner: Mutex<Inner>,
}

impl ResponseSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the slot for a new request.
    pub fn install(&self) -> Result<PendingResponse> {
        let mut inner = self.lock();
        if inner.waiting.is_some() {
            return Err(ClientError::RequestInFlight);
        }
        let id = inner.next_id;
        inner.next_id = inner.next_id.wrapping_add(1);
        let (tx, rx) = oneshot::channel();
        inner.waiting = Some((id, tx));
        Ok(PendingResponse { id, rx })
    }

    /// Take the waiting sender, if any, and complete it with `message`.
    pub fn resolve(&self, message: Bytes) -> Delivery {
        let waiting = self.lock().waiting.take();
        match waiting {
            Some((_, tx)) => match tx.send(message) {
                Ok(()) => Delivery::Resolved,
                Err(_) => Delivery::Abandoned,
            },
            None => Delivery::Unclaimed(message),
        }
    }

    /// Release the slot if it still belongs to request `id`.
    pub fn cancel(&self, id: u64) {
        let mut inner = self.lock();
        if matches!(inner.waiting, Some((waiting, _)) if waiting == id) {
            inner.waiting = None;
        }
    }

    /// Drop any waiting sender; its request fails with `Disconnected`.
    pub fn clear(&self) {
        self.lock().waiting = None;
    }

    pub fn is_pending(&self) -> bool {
        self.lock().waiting.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_installed_request() {
        let slot = ResponseSlot::new();
        let pending = slot.install().unwrap();
        assert!(slot.is_pending());

        assert_eq!(
            slot.resolve(Bytes::from_static(&[1, 2])),
            Delivery::Resolved
        );
        assert!(!slot.is_pending());
        assert_eq!(&pending.recv().await.unwrap()[..], &[1, 2]);
    }

    #[test]
    fn second_install_is_refused() {
        let slot = ResponseSlot::new();
        let _first = slot.install().unwrap();
        assert!(matches!(slot.install(), Err(ClientError::RequestInFlight)));
    }

    #[test]
    fn unclaimed_without_request() {
        let slot = ResponseSlot::new();
        let msg = Bytes::from_static(&[0x04, 0x00, 0x18, 0x00]);
        assert_eq!(slot.resolve(msg.clone()), Delivery::Unclaimed(msg));
    }

    #[test]
    fn dropped_waiter_is_abandoned() {
        let slot = ResponseSlot::new();
        drop(slot.install().unwrap());
        assert_eq!(slot.resolve(Bytes::new()), Delivery::Abandoned);
        assert!(slot.install().is_ok());
    }

    #[tokio::test]
    async fn clear_fails_waiter() {
        let slot = ResponseSlot::new();
        let pending = slot.install().unwrap();
        slot.clear();
        assert!(matches!(
            pending.recv().await,
            Err(ClientError::Disconnected)
        ));
    }

    #[test]
    fn cancel_only_releases_own_request() {
        let slot = ResponseSlot::new();
        let first = slot.install().unwrap();
        let first_id = first.id();
        slot.resolve(Bytes::new());

        let second = slot.install().unwrap();
        slot.cancel(first_id);
        assert!(slot.is_pending());

        slot.cancel(second.id());
        assert!(!slot.is_pending());
    }
}
