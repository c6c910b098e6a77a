use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use obs_schemas::FeedEvent;

use crate::{PushError, INBOUND_CAPACITY};

/// Bounded FIFO of normalized feed events, adapter threads → engine.
///
/// Overflow is lossy by design: `push` fails fast and the adapter decides
/// what to drop. Cloning shares the underlying channel, so adapters hold
/// clones while the engine keeps one consumer.
#[derive(Clone)]
pub struct InboundQueue {
    tx: Sender<FeedEvent>,
    rx: Receiver<FeedEvent>,
}

impl InboundQueue {
    pub fn new() -> Self {
        Self::with_capacity(INBOUND_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self { tx, rx }
    }

    /// Non-blocking push. On overflow the event is returned to the caller
    /// via `PushError::QueueFull`; adapter callbacks must never block.
    pub fn push(&self, event: FeedEvent) -> Result<(), PushError> {
        self.tx.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => PushError::QueueFull,
            TrySendError::Disconnected(_) => PushError::Closed,
        })
    }

    /// Drain up to `max` events in FIFO order (engine only). `None` drains
    /// everything currently queued.
    pub fn drain(&self, max: Option<usize>) -> Vec<FeedEvent> {
        let mut out = Vec::new();
        while max.map_or(true, |cap| out.len() < cap) {
            match self.rx.try_recv() {
                Ok(event) => out.push(event),
                Err(_) => break,
            }
        }
        out
    }

    /// Approximate depth, for monitoring only.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for InboundQueue {
    fn default() -> Self {
        Self::new()
    }
}
