//! Single-slot rendezvous between a command and the router
//!
//! A command arms the slot with [`PendingCall::begin`], sends its request and
//! then awaits the returned [`CallWaiter`]. The router calls
//! [`PendingCall::complete`] for every result frame. Only one call may be
//! outstanding; a second `begin` fails with [`ClientError::CallInFlight`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::ClientError;

#[derive(Default)]
pub struct PendingCall {
    slot: Mutex<Option<oneshot::Sender<()>>>,
    closed: AtomicBool,
}

/// Held by the command that armed the slot
#[derive(Debug)]
pub struct CallWaiter {
    rx: oneshot::Receiver<()>,
}

impl PendingCall {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<oneshot::Sender<()>>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Arm the slot. Must happen before the request is sent so a fast result
    /// cannot slip past.
    pub fn begin(&self) -> Result<CallWaiter, ClientError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ClientError::closed("before the command was sent"));
        }
        let mut slot = self.slot();
        // A sender whose waiter was dropped (e.g. the send failed) no longer
        // blocks the slot.
        if slot.as_ref().is_some_and(|tx| !tx.is_closed()) {
            return Err(ClientError::CallInFlight);
        }
        let (tx, rx) = oneshot::channel();
        *slot = Some(tx);
        Ok(CallWaiter { rx })
    }

    /// Wake the waiting command, if any. Never blocks; a result with nobody
    /// waiting is dropped.
    pub fn complete(&self) -> bool {
        match self.slot().take() {
            Some(tx) => tx.send(()).is_ok(),
            None => {
                debug!("result frame with no pending call");
                false
            }
        }
    }

    /// The connection is gone: fail the current waiter and every later
    /// `begin`.
    pub fn abandon(&self) {
        self.closed.store(true, Ordering::Release);
        // Dropping the sender resolves the waiter with an error.
        self.slot().take();
    }
}

impl CallWaiter {
    pub async fn wait(self) -> Result<(), ClientError> {
        self.rx
            .await
            .map_err(|_| ClientError::closed("while waiting for a result"))
    }
}
