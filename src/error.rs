//! Error types for the connection manager.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use ws_conduit::{ConnectionManager, Result};
//!
//! fn example(manager: &ConnectionManager) -> Result<()> {
//!     manager.connect(None)?;
//!     manager.disconnect()?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Usage | [`Error::AlreadyConnected`], [`Error::NotConnected`] |
//! | Transport | [`Error::Transport`], [`Error::ForcedReconnect`], [`Error::WebSocket`] |
//! | Codec | [`Error::Serialize`], [`Error::Deserialize`], [`Error::Json`] |
//! | Configuration | [`Error::InvalidUrl`] |
//!
//! Usage errors are programmer errors and fail fast with a synchronous
//! `Err`. Transport errors terminate the message feed (after retries are
//! exhausted, when a retry policy is configured). Serialize errors abort a
//! single send; deserialize errors terminate the message feed.

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Usage Errors
    // ========================================================================
    /// `connect` called while a connection attempt is already active, or on
    /// a manager that has completed its connect/disconnect cycle.
    ///
    /// A manager instance permits exactly one `connect`.
    #[error("Connection already active")]
    AlreadyConnected,

    /// `disconnect` or `force_reconnect` called without an active connection.
    #[error("No active connection")]
    NotConnected,

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// The transport reported a failure or closed unexpectedly.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// A synthetic failure injected by `force_reconnect`.
    ///
    /// Without a retry policy this terminates the message feed; the reason
    /// string is carried so consumers can distinguish forced reconnects
    /// from environmental failures.
    #[error("Forced reconnect: {reason}")]
    ForcedReconnect {
        /// Reason supplied to `force_reconnect`.
        reason: String,
    },

    // ========================================================================
    // Codec Errors
    // ========================================================================
    /// The configured serializer rejected an outbound payload.
    ///
    /// Aborts only the send that triggered it; the connection is unaffected.
    #[error("Serialize error: {message}")]
    Serialize {
        /// Description of the serializer failure.
        message: String,
    },

    /// The configured deserializer rejected an inbound frame.
    ///
    /// Terminates the message feed.
    #[error("Deserialize error: {message}")]
    Deserialize {
        /// Description of the deserializer failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// Endpoint URL failed to parse.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a transport error.
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a forced reconnect error.
    #[inline]
    pub fn forced_reconnect(reason: impl Into<String>) -> Self {
        Self::ForcedReconnect {
            reason: reason.into(),
        }
    }

    /// Creates a serialize error.
    #[inline]
    pub fn serialize(message: impl Into<String>) -> Self {
        Self::Serialize {
            message: message.into(),
        }
    }

    /// Creates a deserialize error.
    #[inline]
    pub fn deserialize(message: impl Into<String>) -> Self {
        Self::Deserialize {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a usage error (programmer error, fail fast).
    #[inline]
    #[must_use]
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::AlreadyConnected | Self::NotConnected)
    }

    /// Returns `true` if this is a connection-level error.
    ///
    /// Connection-level errors are global: they terminate the message feed
    /// and cancel every active stream handler conversation.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::ForcedReconnect { .. } | Self::WebSocket(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
