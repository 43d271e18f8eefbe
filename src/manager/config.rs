//! Connection manager configuration.
//!
//! # Example
//!
//! ```ignore
//! use url::Url;
//! use ws_conduit::ManagerConfig;
//!
//! let config = ManagerConfig::new(Url::parse("wss://example.com/ws")?)
//!     .with_protocols(["v1.events"]);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::codec::{Deserializer, Serializer, json_deserializer, json_serializer};
use crate::transport::{TransportFactory, WebSocketFactory};

// ============================================================================
// ManagerConfig
// ============================================================================

/// Configuration for a [`ConnectionManager`](crate::ConnectionManager).
///
/// Defaults: a plain `tokio-tungstenite` WebSocket transport and JSON
/// text-frame codecs.
#[derive(Clone)]
pub struct ManagerConfig {
    /// Endpoint URL passed to the transport factory.
    pub url: Url,

    /// Subprotocols negotiated during the handshake, if any.
    pub protocols: Vec<String>,

    pub(crate) factory: Arc<dyn TransportFactory>,
    pub(crate) serializer: Serializer,
    pub(crate) deserializer: Deserializer,
}

// ============================================================================
// Constructors
// ============================================================================

impl ManagerConfig {
    /// Creates a configuration with default transport and codecs.
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self {
            url,
            protocols: Vec::new(),
            factory: Arc::new(WebSocketFactory),
            serializer: json_serializer(),
            deserializer: json_deserializer(),
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ManagerConfig {
    /// Sets the subprotocols to negotiate.
    #[must_use]
    pub fn with_protocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protocols = protocols.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the transport factory.
    #[must_use]
    pub fn with_factory(mut self, factory: Arc<dyn TransportFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Replaces the outbound serializer.
    #[must_use]
    pub fn with_serializer(mut self, serializer: Serializer) -> Self {
        self.serializer = serializer;
        self
    }

    /// Replaces the inbound deserializer.
    #[must_use]
    pub fn with_deserializer(mut self, deserializer: Deserializer) -> Self {
        self.deserializer = deserializer;
        self
    }
}

impl fmt::Debug for ManagerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerConfig")
            .field("url", &self.url.as_str())
            .field("protocols", &self.protocols)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
