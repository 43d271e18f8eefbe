//! Connection worker: owns the transport lifecycle for one manager.
//!
//! The worker is a spawned task driving the status state machine
//! `uninitialized → connected ⇄ reconnecting → disconnected`. Each iteration
//! of the outer loop opens a fresh transport; a session runs until the user
//! disconnects, the transport fails, or a synthetic failure is injected.
//! Failures consult the retry policy; exhaustion (or the absence of a
//! policy) terminates the message feed with the final error.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, trace, warn};

use crate::error::Error;
use crate::manager::{ConnectionStatus, ManagerShared};
use crate::manager::retry::RetryPolicy;
use crate::transport::{Transport, TransportEvent};

// ============================================================================
// Control
// ============================================================================

/// Commands from the manager API to the worker.
pub(crate) enum Control {
    /// Tear down: close the transport normally, end the feed silently.
    Disconnect,
    /// Inject a synthetic failure carrying the given reason.
    ForceReconnect(String),
}

// ============================================================================
// SessionEnd
// ============================================================================

/// How a connected session ended.
enum SessionEnd {
    /// User-requested disconnect; the transport was closed normally.
    Shutdown,
    /// Transport-level failure; eligible for retry.
    Failed(Error),
    /// Codec failure on an inbound frame; terminates without retry.
    Fatal(Error),
}

// ============================================================================
// Worker Loop
// ============================================================================

/// Runs the connection lifecycle until disconnect or terminal failure.
pub(crate) async fn run_worker(
    shared: Arc<ManagerShared>,
    retry: Option<RetryPolicy>,
    mut control_rx: mpsc::UnboundedReceiver<Control>,
) {
    let mut attempt: u32 = 0;

    let outcome: Result<(), Error> = 'connection: loop {
        // Open a fresh transport, still answering control commands while the
        // handshake is in flight.
        let opened = tokio::select! {
            cmd = control_rx.recv() => match cmd {
                Some(Control::Disconnect) | None => break 'connection Ok(()),
                // Abandons the half-open handshake; the synthetic failure
                // then follows the same path as an open failure.
                Some(Control::ForceReconnect(reason)) => {
                    Err(Error::forced_reconnect(reason))
                }
            },
            result = shared.config.factory.open(&shared.config.url, &shared.config.protocols) => result,
        };

        let failure = match opened {
            Ok(mut transport) => {
                match run_session(&shared, transport.as_mut(), &mut control_rx, &retry, &mut attempt)
                    .await
                {
                    SessionEnd::Shutdown => break 'connection Ok(()),
                    SessionEnd::Fatal(err) => break 'connection Err(err),
                    SessionEnd::Failed(err) => err,
                }
            }
            Err(err) => err,
        };

        attempt += 1;

        let Some(policy) = retry.as_ref() else {
            if let Error::ForcedReconnect { reason } = &failure {
                warn!(
                    reason,
                    "force reconnect without a retry policy terminates the message feed"
                );
            }
            break 'connection Err(failure);
        };

        if policy.is_exhausted(attempt) {
            warn!(attempt, error = %failure, "retry budget exhausted");
            break 'connection Err(failure);
        }

        shared.status_tx.send_replace(ConnectionStatus::Reconnecting);
        let delay = policy.delay_for(&failure, attempt);
        debug!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %failure,
            "reconnecting after delay"
        );

        if !delay.is_zero() {
            let sleep = tokio::time::sleep(delay);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    _ = &mut sleep => break,
                    cmd = control_rx.recv() => match cmd {
                        Some(Control::Disconnect) | None => break 'connection Ok(()),
                        Some(Control::ForceReconnect(reason)) => {
                            debug!(reason, "force reconnect ignored while reconnecting");
                        }
                    },
                }
            }
        }
    };

    shared.status_tx.send_replace(ConnectionStatus::Disconnected);
    shared.queue.complete();

    match outcome {
        Ok(()) => debug!("connection closed"),
        Err(err) => {
            error!(error = %err, "connection terminated");
            if let Some(tx) = shared.messages.lock().as_ref() {
                let _ = tx.send(Err(Arc::new(err)));
            }
        }
    }

    // Dropping the sender completes the message feed for all subscribers;
    // clearing the control slot makes disconnect() fail from here on.
    shared.messages.lock().take();
    shared.control.lock().take();
}

// ============================================================================
// Session
// ============================================================================

/// Drives one opened transport until it ends.
async fn run_session(
    shared: &ManagerShared,
    transport: &mut dyn Transport,
    control_rx: &mut mpsc::UnboundedReceiver<Control>,
    retry: &Option<RetryPolicy>,
    attempt: &mut u32,
) -> SessionEnd {
    // Handshake: exactly one Opened must arrive before anything else.
    loop {
        tokio::select! {
            biased;

            cmd = control_rx.recv() => match cmd {
                Some(Control::Disconnect) | None => {
                    transport.close().await;
                    return SessionEnd::Shutdown;
                }
                Some(Control::ForceReconnect(reason)) => {
                    transport.close().await;
                    return SessionEnd::Failed(Error::forced_reconnect(reason));
                }
            },

            event = transport.recv() => match event {
                Some(TransportEvent::Opened) => break,
                Some(TransportEvent::Errored(message)) => {
                    return SessionEnd::Failed(Error::transport(message));
                }
                Some(TransportEvent::Closed { graceful, reason }) => {
                    return SessionEnd::Failed(closed_error(graceful, reason));
                }
                Some(TransportEvent::Message(_)) => {
                    warn!("message before transport open; dropped");
                }
                None => return SessionEnd::Failed(Error::transport("transport ended before open")),
            },
        }
    }

    if *shared.status_tx.borrow() == ConnectionStatus::Reconnecting {
        if let Some(policy) = retry {
            policy.notify_success();
        }
    }
    *attempt = 0;
    shared.status_tx.send_replace(ConnectionStatus::Connected);
    debug!("transport open");

    let (consumer_tx, mut consumer_rx) = mpsc::unbounded_channel();
    shared.queue.attach_consumer(consumer_tx);

    let mut unsent: Option<Value> = None;

    let end = 'session: loop {
        tokio::select! {
            biased;

            cmd = control_rx.recv() => match cmd {
                Some(Control::Disconnect) | None => {
                    transport.close().await;
                    break 'session SessionEnd::Shutdown;
                }
                Some(Control::ForceReconnect(reason)) => {
                    debug!(reason, "force reconnect requested");
                    transport.close().await;
                    break 'session SessionEnd::Failed(Error::forced_reconnect(reason));
                }
            },

            item = consumer_rx.recv() => {
                if let Some(payload) = item {
                    match (shared.config.serializer)(&payload) {
                        Ok(frame) => {
                            if let Err(err) = transport.send(frame).await {
                                unsent = Some(payload);
                                break 'session SessionEnd::Failed(err);
                            }
                            trace!("payload transmitted");
                        }
                        Err(err) => {
                            // Aborts only this send; the connection stays up.
                            warn!(error = %err, "serializer rejected payload; send aborted");
                        }
                    }
                }
            }

            event = transport.recv() => match event {
                Some(TransportEvent::Message(frame)) => {
                    match (shared.config.deserializer)(frame) {
                        Ok(value) => {
                            if let Some(tx) = shared.messages.lock().as_ref() {
                                let _ = tx.send(Ok(value));
                            }
                        }
                        Err(err) => {
                            transport.close().await;
                            break 'session SessionEnd::Fatal(err);
                        }
                    }
                }
                Some(TransportEvent::Errored(message)) => {
                    break 'session SessionEnd::Failed(Error::transport(message));
                }
                Some(TransportEvent::Closed { graceful, reason }) => {
                    break 'session SessionEnd::Failed(closed_error(graceful, reason));
                }
                Some(TransportEvent::Opened) => warn!("duplicate open event ignored"),
                None => break 'session SessionEnd::Failed(Error::transport("transport event stream ended")),
            },
        }
    };

    // Return payloads stranded between the queue and the transport so the
    // next session transmits them first, preserving FIFO order.
    let mut leftovers = Vec::new();
    if let Some(payload) = unsent {
        leftovers.push(payload);
    }
    while let Ok(payload) = consumer_rx.try_recv() {
        leftovers.push(payload);
    }
    if !leftovers.is_empty() {
        debug!(count = leftovers.len(), "restoring unsent payloads to queue");
        shared.queue.restore_front(leftovers);
    }

    end
}

fn closed_error(graceful: bool, reason: Option<String>) -> Error {
    let kind = if graceful {
        "connection closed by remote"
    } else {
        "connection closed abnormally by remote"
    };
    match reason {
        Some(reason) => Error::transport(format!("{kind}: {reason}")),
        None => Error::transport(kind),
    }
}
