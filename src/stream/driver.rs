//! Per-handler processing loop.
//!
//! One driver task runs per stream handler, consuming submitted requests
//! strictly in order. For each request it waits for the connection, emits
//! `Loading`, transmits the payload, and folds transformed inbound messages
//! into the observable state as `Ready` until the conversation is torn down
//! by a connection drop or a superseding request.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, trace};

use crate::manager::{ConnectionStatus, ManagerShared};
use crate::stream::config::{PendingRequest, StreamConfig, StreamResponse, StreamStatus};

// ============================================================================
// Flow
// ============================================================================

/// Why a conversation ended.
enum Flow {
    /// Connection dropped; the state was reset and the request discarded.
    Cancelled,
    /// A newer submission preempted the conversation.
    Superseded(PendingRequest),
}

// ============================================================================
// Driver Loop
// ============================================================================

/// Runs until every handle to the handler has been dropped.
///
/// The loop itself must outlive every conversation; the status feed closing
/// underneath it is an unrecoverable program error and panics.
pub(crate) async fn run_driver(
    shared: Arc<ManagerShared>,
    mut config: StreamConfig,
    mut requests_rx: mpsc::UnboundedReceiver<PendingRequest>,
    state_tx: watch::Sender<StreamResponse>,
) {
    let mut status_rx = shared.status_tx.subscribe();
    let mut seq: u64 = 0;
    let mut carried: Option<PendingRequest> = None;

    loop {
        let submitted = match carried.take() {
            Some(request) => request,
            None => match requests_rx.recv().await {
                Some(request) => request,
                None => {
                    debug!("all handles dropped; stream handler driver exiting");
                    return;
                }
            },
        };

        seq += 1;
        let pending = match config.transform_requests.as_mut() {
            Some(transform) => match transform(submitted) {
                Some(request) => request,
                None => {
                    trace!(seq, "request dropped by request transform");
                    continue;
                }
            },
            None => submitted,
        };

        trace!(seq, "processing request");
        match process_request(&shared, &config, &state_tx, &mut status_rx, &mut requests_rx, pending)
            .await
        {
            Flow::Cancelled => {}
            Flow::Superseded(next) => carried = Some(next),
        }
    }
}

// ============================================================================
// Conversation
// ============================================================================

/// Drives one request's conversation to its teardown point.
async fn process_request(
    shared: &ManagerShared,
    config: &StreamConfig,
    state_tx: &watch::Sender<StreamResponse>,
    status_rx: &mut watch::Receiver<ConnectionStatus>,
    requests_rx: &mut mpsc::UnboundedReceiver<PendingRequest>,
    mut pending: PendingRequest,
) -> Flow {
    let mut requests_closed = false;

    // Hold the request until the connection is up. A submission made while
    // waiting preempts only when ready-gating is disabled.
    loop {
        tokio::select! {
            biased;

            result = status_rx.wait_for(|status| *status == ConnectionStatus::Connected) => {
                if result.is_err() {
                    panic!("connection status feed closed while stream handler active");
                }
                break;
            }

            submitted = requests_rx.recv(),
                if !requests_closed && !config.await_ready_before_next_request =>
            {
                match submitted {
                    Some(next) => return Flow::Superseded(next),
                    None => requests_closed = true,
                }
            }
        }
    }

    state_tx.send_modify(|state| {
        state.status = StreamStatus::Loading;
        state.request = Some(pending.request.clone());
        if config.reset_response_on_next_request {
            state.response = config.default_response.clone();
        }
        if config.reset_error_on_next_request {
            state.error = None;
        }
    });

    // Subscribe before transmitting so a response arriving immediately after
    // the request hits the wire cannot be missed (the feed has no replay).
    let mut feed = shared.subscribe_messages();
    shared.queue.push(pending.request.clone());

    let mut seen_ready = false;
    let mut feed_done = false;

    loop {
        tokio::select! {
            biased;

            // Ready path first: an emission available at the same instant as
            // a superseding request is applied before cancellation, so the
            // last response of a just-completed request is never lost.
            item = feed.recv(), if !feed_done => {
                match item {
                    Some(Ok(message)) => {
                        let emission = match pending.response_transform.as_mut() {
                            Some(transform) => transform(message),
                            None => Some(Ok(message)),
                        };
                        match emission {
                            None => trace!("inbound message filtered out"),
                            Some(Ok(response)) => {
                                seen_ready = true;
                                state_tx.send_modify(|state| {
                                    state.status = StreamStatus::Ready;
                                    state.response = Some(response);
                                    state.error = None;
                                });
                            }
                            Some(Err(error)) => {
                                seen_ready = true;
                                state_tx.send_modify(|state| {
                                    state.status = StreamStatus::Ready;
                                    state.error = Some(Arc::new(error));
                                });
                            }
                        }
                    }
                    // Connection-level termination is observed via the status
                    // feed; just stop polling the finished message feed.
                    Some(Err(_)) | None => feed_done = true,
                }
            }

            // A reconnect that completes before this poll is coalesced by
            // the watch channel into a plain `Connected` reading; the blip
            // is unobservable here and the conversation continues.
            changed = status_rx.changed() => {
                if changed.is_err() {
                    panic!("connection status feed closed while stream handler active");
                }
                let status = *status_rx.borrow_and_update();
                if status != ConnectionStatus::Connected {
                    debug!(?status, "connection dropped; cancelling conversation");
                    state_tx.send_replace(StreamResponse::initial(config.default_response.clone()));
                    return Flow::Cancelled;
                }
            }

            submitted = requests_rx.recv(),
                if !requests_closed && (seen_ready || !config.await_ready_before_next_request) =>
            {
                match submitted {
                    Some(next) => return Flow::Superseded(next),
                    None => requests_closed = true,
                }
            }
        }
    }
}
