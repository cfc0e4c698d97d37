//! Single-slot completion signal.
//!
//! Background tasks publish into the slot when they finish; an observer (an
//! autoscaler probe, a log watcher) consumes from it. The slot holds at most
//! one unread value: publishing while it is full is a no-op, so any number of
//! completions between two reads collapse into a single pending signal.
use tokio::sync::{
    Mutex,
    mpsc::{self, error::TrySendError},
};

/// Coalescing one-slot channel shared between the gate and its observers.
pub struct EventChannel {
    tx: mpsc::Sender<bool>,
    rx: Mutex<mpsc::Receiver<bool>>,
}

impl EventChannel {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Store `value` unless a signal is already pending. Never blocks.
    ///
    /// Returns `true` if the value was stored.
    pub fn publish(&self, value: bool) -> bool {
        match self.tx.try_send(value) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::trace!("Event channel already holds a signal, dropping publish");
                false
            }
            // The receiver lives in `self`, so the channel cannot be closed here
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Block the calling thread until a signal is available, then take it.
    ///
    /// # Panics
    ///
    /// Panics when called from within an asynchronous execution context; use
    /// [`consume_async`](Self::consume_async) there.
    pub fn consume(&self) -> bool {
        let mut rx = self.rx.blocking_lock();
        // `self.tx` keeps the channel open, so `None` never happens
        rx.blocking_recv().unwrap_or(false)
    }

    /// Async counterpart of [`consume`](Self::consume).
    pub async fn consume_async(&self) -> bool {
        let mut rx = self.rx.lock().await;
        rx.recv().await.unwrap_or(false)
    }

    /// Take the pending signal if there is one, without waiting.
    ///
    /// Also returns `None` while another caller is parked in `consume`.
    pub fn try_consume(&self) -> Option<bool> {
        let mut rx = self.rx.try_lock().ok()?;
        rx.try_recv().ok()
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new()
    }
}
