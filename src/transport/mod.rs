//! Transport layer: the seam between the connection manager and the wire.
//!
//! The manager never touches a socket directly. It drives a boxed
//! [`Transport`] obtained from a [`TransportFactory`], consuming
//! [`TransportEvent`]s and pushing [`WirePayload`]s. Reconnection opens a
//! fresh transport from the same factory; the manager's feeds stay stable
//! across that churn.
//!
//! # Transport Contract
//!
//! A conforming transport:
//!
//! 1. Emits exactly one [`TransportEvent::Opened`] before any
//!    [`TransportEvent::Message`].
//! 2. Emits at most one terminal event ([`TransportEvent::Errored`] or
//!    [`TransportEvent::Closed`]).
//! 3. Does not accept `send` before `Opened`; the [`OutboundQueue`] exists
//!    to buffer payloads until a transport is accepting.
//! 4. Treats `close` as idempotent.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `queue` | FIFO buffer decoupling `send` from transport readiness |
//! | `websocket` | Default transport over `tokio-tungstenite` |

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use url::Url;

use crate::error::Result;

// ============================================================================
// Submodules
// ============================================================================

/// Outbound FIFO queue.
pub mod queue;

/// Default WebSocket transport.
pub mod websocket;

#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Re-exports
// ============================================================================

pub use queue::OutboundQueue;
pub use websocket::WebSocketFactory;

// ============================================================================
// WirePayload
// ============================================================================

/// An opaque frame travelling over the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WirePayload {
    /// A text frame.
    Text(String),
    /// A binary frame.
    Binary(Vec<u8>),
}

impl WirePayload {
    /// Returns the text content, if this is a text frame.
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }
}

// ============================================================================
// TransportEvent
// ============================================================================

/// Lifecycle and data events emitted by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The transport is open and accepting sends. Emitted exactly once,
    /// before any `Message`.
    Opened,

    /// An inbound frame.
    Message(WirePayload),

    /// The transport failed. Terminal.
    Errored(String),

    /// The transport closed. Terminal.
    Closed {
        /// `true` for a normal closure, `false` for an abnormal one.
        graceful: bool,
        /// Close reason supplied by the peer, if any.
        reason: Option<String>,
    },
}

// ============================================================================
// Transport
// ============================================================================

/// A single bidirectional message channel.
///
/// Implementations own the underlying socket; the connection manager owns
/// the lifecycle and replaces the whole transport on reconnect.
#[async_trait]
pub trait Transport: Send {
    /// Receives the next transport event.
    ///
    /// Returns `None` once the event stream is exhausted. Must be
    /// cancellation-safe: dropping the future must not lose an event.
    async fn recv(&mut self) -> Option<TransportEvent>;

    /// Sends a frame. Only valid after `Opened` has been emitted.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the frame could not be written.
    async fn send(&mut self, payload: WirePayload) -> Result<()>;

    /// Closes the transport with a normal-closure code. Idempotent.
    async fn close(&mut self);
}

// ============================================================================
// TransportFactory
// ============================================================================

/// Opens fresh [`Transport`] instances.
///
/// The manager calls `open` once per connection attempt, including every
/// retry, so a factory must be reusable.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    /// Opens a new transport to `url`, negotiating `protocols` if non-empty.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the connection could not be established.
    /// Open failures follow the same retry path as transport errors.
    async fn open(&self, url: &Url, protocols: &[String]) -> Result<Box<dyn Transport>>;
}
