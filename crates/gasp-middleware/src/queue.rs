//! Bounded outbound queue.
//!
//! Many producers (handlers, background tasks, update helpers) push
//! [`ServerEvent`]s through cloned [`Outbox`] handles; one outbound worker at
//! a time drains them with [`OutboundQueue::dequeue`].
//!
//! Producers never block.  When the queue already holds `capacity` events the
//! event being enqueued is dropped and nothing is reported to the caller:
//! liveness wins over delivery under sustained overload.  Buffered events are
//! never reordered or duplicated.

use std::sync::Arc;

use gasp_types::ServerEvent;
use tokio::sync::{Mutex, mpsc};

use crate::outbox::Outbox;

/// Default number of events buffered before new ones are dropped.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// Largest capacity a queue can be created with; larger requests are clamped.
pub const MAX_QUEUE_CAPACITY: usize = tokio::sync::Semaphore::MAX_PERMITS;

/// Bounded MPSC FIFO of outbound events with a drop-on-full policy.
///
/// Cloning the queue is cheap; all clones share one buffer.
#[derive(Clone, Debug)]
pub struct OutboundQueue {
    outbox: Outbox,
    receiver: Arc<Mutex<mpsc::Receiver<ServerEvent>>>,
    capacity: usize,
}

impl OutboundQueue {
    /// Create a queue holding at most `capacity` events, clamped to
    /// `1..=MAX_QUEUE_CAPACITY`.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_QUEUE_CAPACITY);
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            outbox: Outbox::new(sender),
            receiver: Arc::new(Mutex::new(receiver)),
            capacity,
        }
    }

    /// A producer handle for this queue.
    pub fn outbox(&self) -> Outbox {
        self.outbox.clone()
    }

    /// Offer `event` without blocking; dropped silently when full.
    pub fn enqueue(&self, event: ServerEvent) {
        self.outbox.send(event);
    }

    /// Wait for the next event.
    ///
    /// Only one caller drains at a time; concurrent callers wait their turn.
    /// Cancel-safe: dropping the future loses no event.  Returns `None` only
    /// if every producer handle is gone, which cannot happen while the queue
    /// itself is alive.
    pub async fn dequeue(&self) -> Option<ServerEvent> {
        self.receiver.lock().await.recv().await
    }

    /// Take the next event if one is buffered and no other consumer is
    /// draining right now.
    pub fn try_dequeue(&self) -> Option<ServerEvent> {
        self.receiver.try_lock().ok()?.try_recv().ok()
    }

    /// Number of buffered events.
    pub fn len(&self) -> usize {
        self.capacity - self.outbox.available()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for OutboundQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}
