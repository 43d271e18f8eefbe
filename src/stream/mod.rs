//! Stream handlers: request/response conversations over one connection.
//!
//! A handler turns the connection's unstructured inbound feed into a single
//! continuously-observable [`StreamResponse`] per logical conversation.
//! Submitted requests are processed strictly in order; each conversation is
//! cancelled by a connection drop or superseded by a newer request. Any
//! number of handlers multiplex over one manager without affecting each
//! other.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `config` | [`StreamConfig`], [`PendingRequest`], state types |
//! | `driver` | Per-handler processing loop (internal) |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::manager::ManagerShared;

// ============================================================================
// Submodules
// ============================================================================

/// Handler configuration and state types.
pub mod config;

mod driver;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::{
    PendingRequest, RequestTransform, ResponseTransform, StreamConfig, StreamResponse,
    StreamStatus,
};

// ============================================================================
// StreamHandler
// ============================================================================

/// Handle to one request/response conversation engine.
///
/// Created via
/// [`ConnectionManager::stream_handler`](crate::ConnectionManager::stream_handler).
/// Dropping every handle ends the driver task cleanly.
///
/// # Example
///
/// ```ignore
/// use serde_json::json;
/// use ws_conduit::{PendingRequest, StreamConfig, StreamStatus};
///
/// let handler = manager.stream_handler(StreamConfig::new());
/// handler.send(PendingRequest::new(json!({"query": "ticker"})));
///
/// let mut state = handler.state();
/// state.wait_for(|s| s.status == StreamStatus::Ready).await?;
/// println!("{:?}", state.borrow().response);
/// ```
pub struct StreamHandler {
    requests_tx: mpsc::UnboundedSender<PendingRequest>,
    state_rx: watch::Receiver<StreamResponse>,
}

impl StreamHandler {
    /// Spawns the driver task and returns its handle.
    pub(crate) fn spawn(shared: Arc<ManagerShared>, config: StreamConfig) -> Self {
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) =
            watch::channel(StreamResponse::initial(config.default_response.clone()));

        tokio::spawn(driver::run_driver(shared, config, requests_rx, state_tx));

        Self {
            requests_tx,
            state_rx,
        }
    }

    /// Submits a request.
    ///
    /// Every call is a distinct conversation, even with a payload equal to a
    /// previous one. Requests submitted before the connection is up are held
    /// and processed once it is.
    ///
    /// # Panics
    ///
    /// If the driver task has terminated, which cannot happen while any
    /// handle to this handler is alive.
    pub fn send(&self, request: PendingRequest) {
        if self.requests_tx.send(request).is_err() {
            panic!("stream handler driver terminated while a handle was alive");
        }
    }

    /// Returns the observable conversation state.
    ///
    /// Replays the current value on subscribe, starting at
    /// `{ status: uninitialized, response: <default> }`.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<StreamResponse> {
        self.state_rx.clone()
    }
}

// ============================================================================
// Tests
// ============================================================================
