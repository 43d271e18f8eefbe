//! Outbound FIFO queue.
//!
//! Decouples "caller invoked `send`" from "transport is ready to accept
//! bytes". Payloads pushed before any consumer attaches are buffered and
//! flushed, in order, to the first consumer. After the flush the queue acts
//! as a pass-through. When the active consumer goes away (the connection
//! dropped), pushes fall back to buffering until the next consumer attaches,
//! so ordering is preserved across reconnects.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, trace};

// ============================================================================
// OutboundQueue
// ============================================================================

/// FIFO queue for outbound payloads. Never drops or reorders items.
///
/// Owned exclusively by one connection manager; the connection worker
/// attaches a fresh consumer channel on every (re)connect.
pub struct OutboundQueue {
    inner: Mutex<QueueInner>,
}

struct QueueInner {
    buffer: VecDeque<Value>,
    consumer: Option<mpsc::UnboundedSender<Value>>,
    completed: bool,
}

impl OutboundQueue {
    /// Creates an empty queue with no consumer attached.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                buffer: VecDeque::new(),
                consumer: None,
                completed: false,
            }),
        }
    }

    /// Pushes a payload.
    ///
    /// Delivered immediately when a live consumer is attached; buffered
    /// otherwise. Payloads pushed after `complete` are discarded.
    pub fn push(&self, item: Value) {
        let mut inner = self.inner.lock();

        if inner.completed {
            trace!("outbound queue completed; payload discarded");
            return;
        }

        if let Some(consumer) = inner.consumer.take() {
            match consumer.send(item) {
                Ok(()) => {
                    inner.consumer = Some(consumer);
                    return;
                }
                Err(mpsc::error::SendError(item)) => {
                    // Consumer went away with the last connection; buffer
                    // until the next one attaches.
                    trace!("outbound consumer gone; buffering payload");
                    inner.buffer.push_back(item);
                    return;
                }
            }
        }

        inner.buffer.push_back(item);
    }

    /// Attaches a consumer, flushing any buffered payloads to it in FIFO
    /// order first.
    ///
    /// Called by the connection worker once per transport open.
    pub fn attach_consumer(&self, consumer: mpsc::UnboundedSender<Value>) {
        let mut inner = self.inner.lock();

        if inner.completed {
            debug!("outbound queue completed; consumer not attached");
            return;
        }

        let buffered = inner.buffer.len();
        while let Some(item) = inner.buffer.pop_front() {
            if let Err(mpsc::error::SendError(item)) = consumer.send(item) {
                // Consumer died mid-flush; keep the rest buffered in order.
                inner.buffer.push_front(item);
                return;
            }
        }

        if buffered > 0 {
            debug!(flushed = buffered, "outbound queue flushed to consumer");
        }

        inner.consumer = Some(consumer);
    }

    /// Puts unsent payloads back at the head of the buffer, preserving order.
    ///
    /// Used when a connection drops with payloads still in flight between
    /// the queue and the transport.
    pub(crate) fn restore_front(&self, items: Vec<Value>) {
        let mut inner = self.inner.lock();

        if inner.completed {
            return;
        }

        for item in items.into_iter().rev() {
            inner.buffer.push_front(item);
        }
    }

    /// Completes the queue: stops accepting pushes and drops the consumer,
    /// propagating completion to it.
    pub fn complete(&self) {
        let mut inner = self.inner.lock();
        inner.completed = true;
        inner.consumer = None;
        inner.buffer.clear();
    }

    /// Returns the number of buffered (not yet delivered) payloads.
    #[inline]
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.inner.lock().buffer.len()
    }
}

impl Default for OutboundQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
