//! Stream handler configuration and state types.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

// ============================================================================
// Transforms
// ============================================================================

/// Applied to every submitted request before processing.
///
/// Returning `None` drops the submission, e.g. for deduplication.
pub type RequestTransform = Box<dyn FnMut(PendingRequest) -> Option<PendingRequest> + Send + Sync>;

/// Applied per request to every inbound message while the request is active.
///
/// - `None`: the message is not relevant to this request; ignore it.
/// - `Some(Ok(value))`: a response; published as `Ready`.
/// - `Some(Err(error))`: a request-level failure; published as `Ready` with
///   the error set. Never affects the connection or other handlers.
pub type ResponseTransform = Box<dyn FnMut(Value) -> Option<Result<Value, Error>> + Send>;

// ============================================================================
// StreamStatus
// ============================================================================

/// Phase of a stream handler's current conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    /// No request has been processed yet, or the connection dropped.
    Uninitialized,
    /// A request has been transmitted; awaiting its first response.
    Loading,
    /// At least one response (or request-level error) has arrived.
    Ready,
}

// ============================================================================
// StreamResponse
// ============================================================================

/// The continuously-observable state of one stream handler.
///
/// Always has a current value; new subscribers immediately receive the
/// latest one. Mutated only by the owning handler's processing loop.
#[derive(Debug, Clone)]
pub struct StreamResponse {
    /// Conversation phase.
    pub status: StreamStatus,
    /// Latest response value, or the configured default.
    pub response: Option<Value>,
    /// The request currently (or last) being processed.
    pub request: Option<Value>,
    /// Latest request-level error, if any.
    pub error: Option<Arc<Error>>,
}

impl StreamResponse {
    /// The state before any request, and after a connection drop.
    pub(crate) fn initial(default_response: Option<Value>) -> Self {
        Self {
            status: StreamStatus::Uninitialized,
            response: default_response,
            request: None,
            error: None,
        }
    }
}

// ============================================================================
// PendingRequest
// ============================================================================

/// One unit of work submitted to a stream handler.
///
/// Each submission is a distinct conversation even when payloads are equal;
/// construct a fresh `PendingRequest` per `send` call.
pub struct PendingRequest {
    pub(crate) request: Value,
    pub(crate) response_transform: Option<ResponseTransform>,
}

impl PendingRequest {
    /// Wraps a request payload with the identity response transform, which
    /// treats every inbound message as a response.
    #[must_use]
    pub fn new(request: Value) -> Self {
        Self {
            request,
            response_transform: None,
        }
    }

    /// Attaches a response transform scoped to this request.
    #[must_use]
    pub fn with_transform(
        mut self,
        transform: impl FnMut(Value) -> Option<Result<Value, Error>> + Send + 'static,
    ) -> Self {
        self.response_transform = Some(Box::new(transform));
        self
    }
}

impl fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRequest")
            .field("request", &self.request)
            .field(
                "response_transform",
                &self.response_transform.as_ref().map(|_| ".."),
            )
            .finish()
    }
}

// ============================================================================
// StreamConfig
// ============================================================================

/// Configuration for a stream handler.
///
/// # Example
///
/// ```ignore
/// use serde_json::json;
/// use ws_conduit::StreamConfig;
///
/// let config = StreamConfig::new()
///     .with_default_response(json!([]))
///     .with_reset_response_on_next_request(false);
/// ```
pub struct StreamConfig {
    pub(crate) default_response: Option<Value>,
    pub(crate) transform_requests: Option<RequestTransform>,
    pub(crate) reset_response_on_next_request: bool,
    pub(crate) reset_error_on_next_request: bool,
    pub(crate) await_ready_before_next_request: bool,
}

impl StreamConfig {
    /// Creates a configuration with all options at their defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            default_response: None,
            transform_requests: None,
            reset_response_on_next_request: true,
            reset_error_on_next_request: true,
            await_ready_before_next_request: true,
        }
    }

    /// Sets the `response` value held before any request completes.
    #[must_use]
    pub fn with_default_response(mut self, default_response: Value) -> Self {
        self.default_response = Some(default_response);
        self
    }

    /// Filters or rewrites every submission before processing.
    #[must_use]
    pub fn with_transform_requests(
        mut self,
        transform: impl FnMut(PendingRequest) -> Option<PendingRequest> + Send + Sync + 'static,
    ) -> Self {
        self.transform_requests = Some(Box::new(transform));
        self
    }

    /// When `false`, the next request's `Loading` state retains the previous
    /// `response` instead of resetting it to the default.
    #[must_use]
    pub fn with_reset_response_on_next_request(mut self, reset: bool) -> Self {
        self.reset_response_on_next_request = reset;
        self
    }

    /// When `false`, the next request's `Loading` state retains the previous
    /// `error` instead of clearing it.
    #[must_use]
    pub fn with_reset_error_on_next_request(mut self, reset: bool) -> Self {
        self.reset_error_on_next_request = reset;
        self
    }

    /// When `false`, a newly submitted request preempts the current one
    /// immediately instead of waiting for at least one `Ready` emission.
    #[must_use]
    pub fn with_await_ready_before_next_request(mut self, await_ready: bool) -> Self {
        self.await_ready_before_next_request = await_ready;
        self
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamConfig")
            .field("default_response", &self.default_response)
            .field(
                "transform_requests",
                &self.transform_requests.as_ref().map(|_| ".."),
            )
            .field(
                "reset_response_on_next_request",
                &self.reset_response_on_next_request,
            )
            .field(
                "reset_error_on_next_request",
                &self.reset_error_on_next_request,
            )
            .field(
                "await_ready_before_next_request",
                &self.await_ready_before_next_request,
            )
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
