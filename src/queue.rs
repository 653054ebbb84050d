//! Unbounded FIFO event queue.
//!
//! Many producers enqueue without blocking; a single consumer (the dispatch
//! loop) awaits the head. Delivery order is enqueue order.

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{mpsc, Mutex, MutexGuard};

use crate::error::{EngineError, Result};
use crate::event::Event;

pub struct EventQueue {
    sender: mpsc::UnboundedSender<Event>,
    receiver: Mutex<mpsc::UnboundedReceiver<Event>>,
    len: AtomicUsize,
}

impl EventQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Mutex::new(receiver),
            len: AtomicUsize::new(0),
        }
    }

    /// Append `event` to the tail. Never blocks.
    pub fn enqueue(&self, event: Event) -> Result<()> {
        self.len.fetch_add(1, Ordering::SeqCst);
        self.sender.send(event).map_err(|_| {
            self.len.fetch_sub(1, Ordering::SeqCst);
            EngineError::QueueClosed
        })
    }

    /// Claim the consumer side.
    ///
    /// Waits if another consumer currently holds it.
    pub async fn consumer(&self) -> QueueConsumer<'_> {
        QueueConsumer {
            receiver: self.receiver.lock().await,
            len: &self.len,
        }
    }

    /// Claim the consumer side only if nobody holds it.
    #[cfg(test)]
    pub(crate) fn try_consumer(&self) -> Option<QueueConsumer<'_>> {
        self.receiver.try_lock().ok().map(|receiver| QueueConsumer {
            receiver,
            len: &self.len,
        })
    }

    /// Events enqueued but not yet dequeued.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive consumer handle for an [`EventQueue`].
pub struct QueueConsumer<'a> {
    receiver: MutexGuard<'a, mpsc::UnboundedReceiver<Event>>,
    len: &'a AtomicUsize,
}

impl QueueConsumer<'_> {
    /// Remove and return the head, waiting until one is available.
    ///
    /// Cancel safe: dropping the future before it resolves loses no event.
    pub async fn dequeue(&mut self) -> Result<Event> {
        match self.receiver.recv().await {
            Some(event) => {
                self.len.fetch_sub(1, Ordering::SeqCst);
                Ok(event)
            }
            None => Err(EngineError::QueueClosed),
        }
    }
}
