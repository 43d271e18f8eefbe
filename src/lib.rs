//! ws-conduit - Client-side WebSocket connection management.
//!
//! This library keeps one logical connection alive across transport churn
//! and multiplexes request/response conversations over it.
//!
//! # Architecture
//!
//! The manager sits between user code and a pluggable transport:
//!
//! - **Connection Manager**: lifecycle state machine with automatic retry
//! - **Outbound Queue**: accepts sends before and between transports
//! - **Stream Handlers**: ordered request/response conversations sharing
//!   one inbound feed
//!
//! Key design principles:
//!
//! - Each [`ConnectionManager`] owns: transport lifecycle + status feed +
//!   outbound queue; one `connect`/`disconnect` cycle per instance
//! - Feeds survive reconnection; subscribers never resubscribe
//! - Codecs are pluggable pure functions (JSON text frames by default)
//! - Transports are a trait boundary; tests script them over channels
//!
//! # Quick Start
//!
//! ```no_run
//! use serde_json::json;
//! use url::Url;
//! use ws_conduit::{ConnectionManager, ManagerConfig, Result, RetryPolicy};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let manager = ConnectionManager::new(ManagerConfig::new(
//!         Url::parse("wss://example.com/ws")?,
//!     ));
//!
//!     // Queued until the transport accepts sends.
//!     manager.send(json!({"subscribe": "ticker"}));
//!     manager.connect(Some(RetryPolicy::new().with_max_retries(5)))?;
//!
//!     let mut messages = manager.messages();
//!     while let Some(item) = messages.recv().await {
//!         println!("inbound: {item:?}");
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`codec`] | Pluggable serialize/deserialize functions |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`manager`] | Connection lifecycle, retry, feeds |
//! | [`stream`] | Request/response stream handlers |
//! | [`transport`] | Transport trait and WebSocket implementation |

// ============================================================================
// Modules
// ============================================================================

/// Pluggable message codecs.
///
/// Serializers and deserializers are pure functions applied per payload;
/// JSON text frames are the default.
pub mod codec;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Connection lifecycle management.
///
/// The [`ConnectionManager`], its configuration, and the retry policy.
pub mod manager;

/// Request/response stream handlers.
///
/// One observable conversation state per handler, any number of handlers
/// per connection.
pub mod stream;

/// Transport layer.
///
/// The [`Transport`] trait boundary, the default `tokio-tungstenite`
/// implementation, and the outbound queue.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Codec types
pub use codec::{Deserializer, Serializer, json_deserializer, json_serializer};

// Error types
pub use error::{Error, Result};

// Manager types
pub use manager::{
    ConnectionManager, ConnectionStatus, InboundItem, ManagerConfig, MessageFeed, RetryDelay,
    RetryPolicy,
};

// Stream handler types
pub use stream::{
    PendingRequest, RequestTransform, ResponseTransform, StreamConfig, StreamHandler,
    StreamResponse, StreamStatus,
};

// Transport types
pub use transport::{Transport, TransportEvent, TransportFactory, WebSocketFactory, WirePayload};
