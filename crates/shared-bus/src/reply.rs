//! # Reply (single-fire callback guard)
//!
//! Every kernel call carries a [`Reply`]. The first [`Reply::send`] is
//! delivered; every later one, from any clone, is dropped. Clones share one
//! slot, so a timeout branch and a success branch racing each other resolve
//! the caller exactly once.
//!
//! A reply may be empty ([`Reply::none`]). Sending on it logs a diagnostic
//! instead of failing.

use parking_lot::Mutex;
use shared_types::{BusError, BusResult};
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{trace, warn};

type Callback = Box<dyn FnOnce(BusResult) + Send>;

enum Sink {
    Channel(oneshot::Sender<BusResult>),
    Callback(Callback),
}

/// Take-once reply handle.
#[derive(Clone, Default)]
pub struct Reply {
    slot: Option<Arc<Mutex<Option<Sink>>>>,
}

impl Reply {
    /// A reply with no callback behind it.
    pub fn none() -> Self {
        Self { slot: None }
    }

    /// A reply resolved through a one-shot channel.
    pub fn channel() -> (Self, ReplyReceiver) {
        let (sender, receiver) = oneshot::channel();
        (Self::from_sink(Sink::Channel(sender)), ReplyReceiver(receiver))
    }

    /// A reply that runs `callback` on first send.
    pub fn from_fn<F>(callback: F) -> Self
    where
        F: FnOnce(BusResult) + Send + 'static,
    {
        Self::from_sink(Sink::Callback(Box::new(callback)))
    }

    fn from_sink(sink: Sink) -> Self {
        Self {
            slot: Some(Arc::new(Mutex::new(Some(sink)))),
        }
    }

    /// Whether a callback was supplied.
    pub fn is_present(&self) -> bool {
        self.slot.is_some()
    }

    /// Whether the reply has already been sent (or was never present).
    pub fn is_spent(&self) -> bool {
        self.slot.as_ref().map_or(true, |slot| slot.lock().is_none())
    }

    /// Deliver `result`. Returns `true` only for the first delivery.
    pub fn send(&self, result: BusResult) -> bool {
        let Some(slot) = &self.slot else {
            warn!(?result, "Reply sent but the caller supplied no callback");
            return false;
        };

        // Take under the lock, deliver outside it.
        let sink = slot.lock().take();
        match sink {
            Some(Sink::Channel(sender)) => {
                if sender.send(result).is_err() {
                    trace!("Reply receiver already dropped");
                }
                true
            }
            Some(Sink::Callback(callback)) => {
                callback(result);
                true
            }
            None => {
                trace!("Reply already sent, dropping duplicate");
                false
            }
        }
    }

    /// Shorthand for `send(Ok(value))`.
    pub fn ok(&self, value: serde_json::Value) -> bool {
        self.send(Ok(value))
    }

    /// Shorthand for `send(Err(error))`.
    pub fn err(&self, error: BusError) -> bool {
        self.send(Err(error))
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reply")
            .field("present", &self.is_present())
            .field("spent", &self.is_spent())
            .finish()
    }
}

/// Receiving half of [`Reply::channel`].
#[derive(Debug)]
pub struct ReplyReceiver(oneshot::Receiver<BusResult>);

impl ReplyReceiver {
    /// Wait for the reply. Every clone dropped unsent yields
    /// [`BusError::ReplyDropped`].
    pub async fn recv(self) -> BusResult {
        self.0.await.unwrap_or(Err(BusError::ReplyDropped))
    }

    /// Non-blocking poll. `None` while still pending.
    pub fn try_recv(&mut self) -> Option<BusResult> {
        match self.0.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(BusError::ReplyDropped)),
        }
    }
}
