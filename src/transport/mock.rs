//! Channel-scripted transport for tests.
//!
//! A [`MockFactory`] hands out one [`MockTransport`] per `open` call and
//! publishes the test-facing ends of its channels as a [`MockSession`], so a
//! test can feed transport events and observe transmitted frames in order.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{Notify, mpsc};
use url::Url;

use crate::error::{Error, Result};

use super::{Transport, TransportEvent, TransportFactory, WirePayload};

// ============================================================================
// MockSession
// ============================================================================

/// Test-facing handles for one opened mock transport.
pub(crate) struct MockSession {
    /// Feeds events into the transport's `recv`.
    pub events: mpsc::UnboundedSender<TransportEvent>,
    /// Observes frames passed to the transport's `send`.
    pub sent: mpsc::UnboundedReceiver<WirePayload>,
    /// Set once `close` has been called.
    pub closed: Arc<AtomicBool>,
}

impl MockSession {
    /// Shorthand: emit `Opened`.
    pub fn open(&self) {
        self.events
            .send(TransportEvent::Opened)
            .expect("mock transport gone");
    }

    /// Shorthand: emit an inbound text frame.
    pub fn message(&self, text: &str) {
        self.events
            .send(TransportEvent::Message(WirePayload::Text(text.to_string())))
            .expect("mock transport gone");
    }

    /// Shorthand: emit a transport error.
    pub fn fail(&self, message: &str) {
        let _ = self
            .events
            .send(TransportEvent::Errored(message.to_string()));
    }

    /// Shorthand: emit a close event.
    pub fn close(&self, graceful: bool) {
        let _ = self.events.send(TransportEvent::Closed {
            graceful,
            reason: None,
        });
    }

    /// Returns `true` once the manager closed this transport.
    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

// ============================================================================
// MockFactory
// ============================================================================

/// Factory producing scripted transports, one per `open` call.
pub(crate) struct MockFactory {
    sessions: mpsc::UnboundedSender<MockSession>,
    fail_opens: AtomicUsize,
    opens: AtomicUsize,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl MockFactory {
    /// Creates a factory and the channel on which sessions are delivered.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<MockSession>) {
        let (sessions_tx, sessions_rx) = mpsc::unbounded_channel();
        let factory = Arc::new(Self {
            sessions: sessions_tx,
            fail_opens: AtomicUsize::new(0),
            opens: AtomicUsize::new(0),
            gate: Mutex::new(None),
        });
        (factory, sessions_rx)
    }

    /// Makes the next `count` open calls fail.
    pub fn fail_next_opens(&self, count: usize) {
        self.fail_opens.store(count, Ordering::SeqCst);
    }

    /// Holds every subsequent `open` call in flight until the returned gate
    /// is notified, one release per notification.
    pub fn gate_opens(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    /// Returns how many times `open` was called.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransportFactory for MockFactory {
    async fn open(&self, _url: &Url, _protocols: &[String]) -> Result<Box<dyn Transport>> {
        self.opens.fetch_add(1, Ordering::SeqCst);

        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let remaining = self.fail_opens.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_opens.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::transport("scripted open failure"));
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        let session = MockSession {
            events: events_tx,
            sent: sent_rx,
            closed: Arc::clone(&closed),
        };
        self.sessions.send(session).map_err(|_| {
            Error::transport("mock session receiver dropped")
        })?;

        Ok(Box::new(MockTransport {
            events: events_rx,
            sent: sent_tx,
            closed,
        }))
    }
}

// ============================================================================
// MockTransport
// ============================================================================

pub(crate) struct MockTransport {
    events: mpsc::UnboundedReceiver<TransportEvent>,
    sent: mpsc::UnboundedSender<WirePayload>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn recv(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }

    async fn send(&mut self, payload: WirePayload) -> Result<()> {
        self.sent
            .send(payload)
            .map_err(|_| Error::transport("mock peer gone"))
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
