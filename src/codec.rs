//! Pluggable message encoding and decoding.
//!
//! The connection manager treats wire framing as opaque: a serializer turns
//! an outbound [`Value`] into a [`WirePayload`] and a deserializer turns an
//! inbound [`WirePayload`] back into a [`Value`]. Both are plain functions so
//! callers can swap in any codec without touching the transport.
//!
//! The defaults speak JSON text frames, matching the text protocols most
//! WebSocket APIs use. The default deserializer rejects binary frames with
//! a descriptive error rather than guessing at an encoding.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::transport::WirePayload;

// ============================================================================
// Codec Types
// ============================================================================

/// Encodes an outbound payload into a wire frame.
///
/// A failure aborts only the send that triggered it.
pub type Serializer = Arc<dyn Fn(&Value) -> Result<WirePayload> + Send + Sync>;

/// Decodes an inbound wire frame into a payload.
///
/// A failure terminates the message feed.
pub type Deserializer = Arc<dyn Fn(WirePayload) -> Result<Value> + Send + Sync>;

// ============================================================================
// JSON Defaults
// ============================================================================

/// Returns the default serializer: JSON-encode into a text frame.
#[must_use]
pub fn json_serializer() -> Serializer {
    Arc::new(|value| Ok(WirePayload::Text(serde_json::to_string(value)?)))
}

/// Returns the default deserializer: JSON-decode from a text frame.
///
/// Binary frames fail with [`Error::Deserialize`] naming the frame size, so
/// misconfigured peers are diagnosable from the terminating error alone.
#[must_use]
pub fn json_deserializer() -> Deserializer {
    Arc::new(|payload| match payload {
        WirePayload::Text(text) => Ok(serde_json::from_str(&text)?),
        WirePayload::Binary(bytes) => Err(Error::deserialize(format!(
            "expected a text frame, received {} bytes of binary data",
            bytes.len()
        ))),
    })
}

// ============================================================================
// Tests
// ============================================================================
