//! Connection manager: one logical connection over many physical transports.
//!
//! The manager owns the transport lifecycle, the status state machine, the
//! retry policy and the outbound queue, and exposes feeds that stay stable
//! across reconnection churn:
//!
//! - a **status feed** with current-value replay (`watch`), and
//! - a **message feed** of decoded inbound payloads, multicast with no
//!   replay (`broadcast`); late subscribers only see future emissions.
//!
//! # Lifecycle
//!
//! ```text
//! uninitialized ──connect──► connected ◄─────► reconnecting
//!                                │                  │
//!                          disconnect        retries exhausted
//!                                ▼                  ▼
//!                            disconnected ◄─────────┘
//! ```
//!
//! A manager instance permits exactly one `connect`/`disconnect` cycle;
//! calling `connect` twice, or after `disconnect`, is a usage error.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `config` | [`ManagerConfig`] and codec/transport defaults |
//! | `retry` | [`RetryPolicy`] and delay strategies |
//! | `worker` | Connection lifecycle task (internal) |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::stream::{StreamConfig, StreamHandler};
use crate::transport::OutboundQueue;

use self::worker::Control;

// ============================================================================
// Submodules
// ============================================================================

/// Manager configuration.
pub mod config;

/// Retry policy for reconnection.
pub mod retry;

pub(crate) mod worker;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::ManagerConfig;
pub use retry::{RetryDelay, RetryPolicy};

// ============================================================================
// Constants
// ============================================================================

/// Reason used by `force_reconnect` when the caller supplies none.
pub const DEFAULT_FORCE_RECONNECT_REASON: &str = "force reconnect";

/// Broadcast capacity of the message feed.
///
/// Slow subscribers past this many buffered messages observe a lag warning
/// and skip ahead; they never block the connection.
const MESSAGE_FEED_CAPACITY: usize = 256;

// ============================================================================
// ConnectionStatus
// ============================================================================

/// Connection lifecycle status.
///
/// Owned exclusively by the manager; mutated only on transport lifecycle
/// events, `connect`, `disconnect`, or retry transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// No transport has been opened yet.
    Uninitialized,
    /// The transport is open and accepting sends.
    Connected,
    /// The transport failed; a retry is pending or in flight.
    Reconnecting,
    /// The connection ended. Terminal for this manager instance.
    Disconnected,
}

// ============================================================================
// MessageFeed
// ============================================================================

/// An inbound item: a decoded payload, or the terminating connection error.
pub type InboundItem = std::result::Result<Value, Arc<Error>>;

/// A subscription to the multicast inbound message feed.
///
/// Every subscriber sees the same emissions, exactly once each; there is no
/// replay of history. The feed ends with an `Err` item on connection
/// failure, or silently after a clean `disconnect`.
pub struct MessageFeed {
    rx: broadcast::Receiver<InboundItem>,
}

impl MessageFeed {
    /// Receives the next inbound item.
    ///
    /// Returns `None` once the feed has completed. A subscriber that falls
    /// more than the feed capacity behind skips the missed messages with a
    /// warning rather than stalling the connection.
    pub async fn recv(&mut self) -> Option<InboundItem> {
        loop {
            match self.rx.recv().await {
                Ok(item) => return Some(item),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "message feed subscriber lagged; skipping ahead");
                }
            }
        }
    }
}

// ============================================================================
// ManagerShared
// ============================================================================

/// State shared between the manager API, its worker, and stream handlers.
pub(crate) struct ManagerShared {
    pub(crate) config: ManagerConfig,
    pub(crate) queue: OutboundQueue,
    pub(crate) status_tx: watch::Sender<ConnectionStatus>,
    pub(crate) messages: Mutex<Option<broadcast::Sender<InboundItem>>>,
    pub(crate) control: Mutex<Option<mpsc::UnboundedSender<Control>>>,
    pub(crate) opened: AtomicBool,
}

impl ManagerShared {
    /// Subscribes to the message feed.
    ///
    /// After the worker has terminated the subscription is already
    /// completed, so `recv` returns `None` immediately.
    pub(crate) fn subscribe_messages(&self) -> MessageFeed {
        let rx = match self.messages.lock().as_ref() {
            Some(tx) => tx.subscribe(),
            None => {
                let (tx, rx) = broadcast::channel(1);
                drop(tx);
                rx
            }
        };
        MessageFeed { rx }
    }
}

// ============================================================================
// ConnectionManager
// ============================================================================

/// Client-side manager for a single WebSocket connection.
///
/// # Example
///
/// ```ignore
/// use serde_json::json;
/// use url::Url;
/// use ws_conduit::{ConnectionManager, ManagerConfig, RetryPolicy};
///
/// let manager = ConnectionManager::new(ManagerConfig::new(
///     Url::parse("wss://example.com/ws")?,
/// ));
///
/// // Queued until the transport is accepting.
/// manager.send(json!({"subscribe": "ticker"}));
/// manager.connect(Some(RetryPolicy::new().with_max_retries(5)))?;
///
/// let mut messages = manager.messages();
/// while let Some(item) = messages.recv().await {
///     println!("{item:?}");
/// }
/// ```
pub struct ConnectionManager {
    shared: Arc<ManagerShared>,
}

impl ConnectionManager {
    /// Creates a manager. No connection is attempted until [`connect`].
    ///
    /// [`connect`]: ConnectionManager::connect
    #[must_use]
    pub fn new(config: ManagerConfig) -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::Uninitialized);
        let (messages_tx, _) = broadcast::channel(MESSAGE_FEED_CAPACITY);

        Self {
            shared: Arc::new(ManagerShared {
                config,
                queue: OutboundQueue::new(),
                status_tx,
                messages: Mutex::new(Some(messages_tx)),
                control: Mutex::new(None),
                opened: AtomicBool::new(false),
            }),
        }
    }

    /// Opens the connection, spawning the lifecycle worker.
    ///
    /// With a [`RetryPolicy`], transport failures transition to
    /// `Reconnecting` and reopen a fresh transport; without one, the first
    /// failure terminates the message feed. Must be called from within a
    /// tokio runtime.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyConnected`] if `connect` was already called on this
    /// instance, including after `disconnect`; a manager is single-use.
    pub fn connect(&self, retry_policy: Option<RetryPolicy>) -> Result<()> {
        if self.shared.opened.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyConnected);
        }

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        *self.shared.control.lock() = Some(control_tx);

        debug!(url = %self.shared.config.url, "connecting");
        tokio::spawn(worker::run_worker(
            Arc::clone(&self.shared),
            retry_policy,
            control_rx,
        ));

        Ok(())
    }

    /// Tears down the active connection.
    ///
    /// The transport is closed with a normal-closure code, status becomes
    /// `Disconnected`, and the message feed completes silently.
    ///
    /// # Errors
    ///
    /// [`Error::NotConnected`] if no connection is active, including a
    /// second `disconnect`.
    pub fn disconnect(&self) -> Result<()> {
        let mut guard = self.shared.control.lock();
        match guard.take() {
            Some(tx) if tx.send(Control::Disconnect).is_ok() => Ok(()),
            _ => Err(Error::NotConnected),
        }
    }

    /// Injects a synthetic failure into the active connection, driving the
    /// same path as a transport error.
    ///
    /// With a retry policy this forces a reconnect. **Without one, the
    /// synthetic failure terminates the message feed**, surprising behavior
    /// callers must opt into deliberately; a warning is logged when it
    /// happens.
    ///
    /// # Errors
    ///
    /// [`Error::NotConnected`] if no connection is active.
    pub fn force_reconnect(&self, reason: Option<&str>) -> Result<()> {
        let reason = reason.unwrap_or(DEFAULT_FORCE_RECONNECT_REASON).to_string();
        let guard = self.shared.control.lock();
        match guard.as_ref() {
            Some(tx) if tx.send(Control::ForceReconnect(reason)).is_ok() => Ok(()),
            _ => Err(Error::NotConnected),
        }
    }

    /// Enqueues a payload for transmission.
    ///
    /// Never fails synchronously: payloads queued before `connect` (or while
    /// reconnecting) are delivered in order once the transport is accepting.
    /// Serialization happens at transmission time; a serializer failure
    /// aborts only that payload.
    pub fn send(&self, payload: Value) {
        self.shared.queue.push(payload);
    }

    /// Subscribes to the multicast inbound message feed.
    ///
    /// Late subscribers do not replay history.
    #[must_use]
    pub fn messages(&self) -> MessageFeed {
        self.shared.subscribe_messages()
    }

    /// Returns the status feed. Replays the current status on subscribe.
    #[must_use]
    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.shared.status_tx.subscribe()
    }

    /// Creates a stream handler multiplexed over this connection.
    ///
    /// Each handler correlates its own submitted requests with responses
    /// drawn from the shared message feed; handlers never affect each other
    /// and the manager is agnostic to how many exist.
    #[must_use]
    pub fn stream_handler(&self, config: StreamConfig) -> StreamHandler {
        StreamHandler::spawn(Arc::clone(&self.shared), config)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    use serde_json::json;
    use url::Url;

    use crate::codec::Serializer;
    use crate::transport::mock::{MockFactory, MockSession};
    use crate::transport::{TransportFactory, WirePayload};

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("ws_conduit=debug")
            .with_test_writer()
            .try_init();
    }

    fn mock_manager() -> (
        ConnectionManager,
        Arc<MockFactory>,
        mpsc::UnboundedReceiver<MockSession>,
    ) {
        init_tracing();
        let (factory, sessions) = MockFactory::new();
        let transport_factory: Arc<dyn TransportFactory> = factory.clone();
        let config = ManagerConfig::new(Url::parse("ws://mock.invalid/ws").expect("url"))
            .with_factory(transport_factory);
        (ConnectionManager::new(config), factory, sessions)
    }

    async fn wait_status(manager: &ConnectionManager, status: ConnectionStatus) {
        manager
            .status()
            .wait_for(|current| *current == status)
            .await
            .expect("status feed open");
    }

    #[tokio::test]
    async fn test_initial_status_is_uninitialized() {
        let (manager, _factory, _sessions) = mock_manager();
        assert_eq!(*manager.status().borrow(), ConnectionStatus::Uninitialized);
    }

    #[tokio::test]
    async fn test_sends_before_connect_flush_in_order() {
        let (manager, _factory, mut sessions) = mock_manager();

        manager.send(json!({"n": 1}));
        manager.send(json!({"n": 2}));
        manager.connect(None).expect("connect");

        let mut session = sessions.recv().await.expect("session");
        session.open();

        assert_eq!(
            session.sent.recv().await,
            Some(WirePayload::Text(r#"{"n":1}"#.to_string()))
        );
        assert_eq!(
            session.sent.recv().await,
            Some(WirePayload::Text(r#"{"n":2}"#.to_string()))
        );

        // Pass-through once connected.
        manager.send(json!({"n": 3}));
        assert_eq!(
            session.sent.recv().await,
            Some(WirePayload::Text(r#"{"n":3}"#.to_string()))
        );
    }

    #[tokio::test]
    async fn test_double_connect_fails() {
        let (manager, _factory, _sessions) = mock_manager();
        manager.connect(None).expect("first connect");
        assert!(matches!(manager.connect(None), Err(Error::AlreadyConnected)));
    }

    #[tokio::test]
    async fn test_disconnect_without_connect_fails() {
        let (manager, _factory, _sessions) = mock_manager();
        assert!(matches!(manager.disconnect(), Err(Error::NotConnected)));
        assert!(matches!(
            manager.force_reconnect(None),
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_manager_is_single_use() {
        let (manager, _factory, mut sessions) = mock_manager();
        manager.connect(None).expect("connect");
        let _session = sessions.recv().await.expect("session");
        _session.open();
        wait_status(&manager, ConnectionStatus::Connected).await;

        manager.disconnect().expect("disconnect");
        assert!(matches!(manager.disconnect(), Err(Error::NotConnected)));
        assert!(matches!(manager.connect(None), Err(Error::AlreadyConnected)));
    }

    #[tokio::test]
    async fn test_disconnect_closes_transport_and_completes_feed() {
        let (manager, _factory, mut sessions) = mock_manager();
        manager.connect(None).expect("connect");
        let session = sessions.recv().await.expect("session");
        session.open();
        wait_status(&manager, ConnectionStatus::Connected).await;

        let mut feed = manager.messages();
        manager.disconnect().expect("disconnect");

        // Silent completion: no terminal error item.
        assert!(feed.recv().await.is_none());
        assert_eq!(*manager.status().borrow(), ConnectionStatus::Disconnected);
        assert!(session.was_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_success_fires_once_per_reconnection() {
        let (manager, _factory, mut sessions) = mock_manager();

        let fired = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&fired);
        let policy = RetryPolicy::new()
            .with_fixed_delay(Duration::ZERO)
            .with_on_success(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        manager.connect(Some(policy)).expect("connect");
        let first = sessions.recv().await.expect("session");
        first.open();
        wait_status(&manager, ConnectionStatus::Connected).await;
        // Never fires for the initial connection.
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        let mut status = manager.status();
        first.fail("socket reset");

        status.changed().await.expect("status feed");
        assert_eq!(
            *status.borrow_and_update(),
            ConnectionStatus::Reconnecting
        );

        let second = sessions.recv().await.expect("session");
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        second.open();

        status.changed().await.expect("status feed");
        assert_eq!(*status.borrow_and_update(), ConnectionStatus::Connected);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_graceful_remote_close_retries_with_policy() {
        let (manager, factory, mut sessions) = mock_manager();
        let policy = RetryPolicy::new().with_fixed_delay(Duration::from_millis(50));

        manager.connect(Some(policy)).expect("connect");
        let first = sessions.recv().await.expect("session");
        first.open();
        wait_status(&manager, ConnectionStatus::Connected).await;

        first.close(true);
        let second = sessions.recv().await.expect("session");
        second.open();
        wait_status(&manager, ConnectionStatus::Connected).await;

        assert_eq!(factory.open_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhaustion_terminates_feed() {
        let (manager, factory, _sessions) = mock_manager();
        factory.fail_next_opens(10);

        let policy = RetryPolicy::new()
            .with_max_retries(2)
            .with_fixed_delay(Duration::from_millis(10));

        let mut feed = manager.messages();
        manager.connect(Some(policy)).expect("connect");

        match feed.recv().await {
            Some(Err(err)) => assert!(err.to_string().contains("scripted open failure")),
            other => panic!("expected terminal error, got {other:?}"),
        }
        assert!(feed.recv().await.is_none());

        // Initial attempt plus two retries.
        assert_eq!(factory.open_count(), 3);
        assert_eq!(*manager.status().borrow(), ConnectionStatus::Disconnected);
        assert!(matches!(manager.disconnect(), Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn test_unretried_failure_terminates_feed() {
        let (manager, _factory, mut sessions) = mock_manager();
        manager.connect(None).expect("connect");
        let session = sessions.recv().await.expect("session");
        session.open();
        wait_status(&manager, ConnectionStatus::Connected).await;

        let mut feed = manager.messages();
        session.fail("socket reset");

        match feed.recv().await {
            Some(Err(err)) => assert!(err.to_string().contains("socket reset")),
            other => panic!("expected terminal error, got {other:?}"),
        }
        assert!(feed.recv().await.is_none());
        assert_eq!(*manager.status().borrow(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_force_reconnect_without_policy_terminates_feed() {
        let (manager, _factory, mut sessions) = mock_manager();
        manager.connect(None).expect("connect");
        let _session = sessions.recv().await.expect("session");
        _session.open();
        wait_status(&manager, ConnectionStatus::Connected).await;

        let mut feed = manager.messages();
        manager
            .force_reconnect(Some("maintenance window"))
            .expect("force reconnect");

        match feed.recv().await {
            Some(Err(err)) => assert!(err.to_string().contains("maintenance window")),
            other => panic!("expected terminal error, got {other:?}"),
        }
        assert!(feed.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_force_reconnect_default_reason() {
        let (manager, _factory, mut sessions) = mock_manager();
        manager.connect(None).expect("connect");
        let _session = sessions.recv().await.expect("session");
        _session.open();
        wait_status(&manager, ConnectionStatus::Connected).await;

        let mut feed = manager.messages();
        manager.force_reconnect(None).expect("force reconnect");

        match feed.recv().await {
            Some(Err(err)) => {
                assert!(err.to_string().contains(DEFAULT_FORCE_RECONNECT_REASON));
            }
            other => panic!("expected terminal error, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_reconnect_with_policy_reconnects() {
        let (manager, factory, mut sessions) = mock_manager();
        let policy = RetryPolicy::new().with_fixed_delay(Duration::ZERO);

        manager.connect(Some(policy)).expect("connect");
        let first = sessions.recv().await.expect("session");
        first.open();
        wait_status(&manager, ConnectionStatus::Connected).await;

        manager.force_reconnect(None).expect("force reconnect");
        let second = sessions.recv().await.expect("session");
        second.open();
        wait_status(&manager, ConnectionStatus::Connected).await;

        assert!(first.was_closed());
        assert_eq!(factory.open_count(), 2);
    }

    #[tokio::test]
    async fn test_force_reconnect_during_handshake_terminates_without_policy() {
        let (manager, factory, _sessions) = mock_manager();
        let _gate = factory.gate_opens();

        let mut feed = manager.messages();
        manager.connect(None).expect("connect");

        // Let the worker reach the in-flight open.
        while factory.open_count() == 0 {
            tokio::task::yield_now().await;
        }
        manager
            .force_reconnect(Some("mid handshake"))
            .expect("force reconnect");

        match feed.recv().await {
            Some(Err(err)) => assert!(err.to_string().contains("mid handshake")),
            other => panic!("expected terminal error, got {other:?}"),
        }
        assert!(feed.recv().await.is_none());
        assert_eq!(*manager.status().borrow(), ConnectionStatus::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_reconnect_during_handshake_retries_with_policy() {
        let (manager, factory, mut sessions) = mock_manager();
        let gate = factory.gate_opens();
        let policy = RetryPolicy::new().with_fixed_delay(Duration::ZERO);

        manager.connect(Some(policy)).expect("connect");
        while factory.open_count() == 0 {
            tokio::task::yield_now().await;
        }
        manager.force_reconnect(None).expect("force reconnect");

        // The abandoned handshake counts as a failed attempt; the retry
        // opens again. Release the gate for the second attempt.
        while factory.open_count() < 2 {
            tokio::task::yield_now().await;
        }
        gate.notify_one();

        let session = sessions.recv().await.expect("session");
        session.open();
        wait_status(&manager, ConnectionStatus::Connected).await;
        assert_eq!(factory.open_count(), 2);
    }

    #[tokio::test]
    async fn test_abnormal_remote_close_is_named_in_the_error() {
        let (manager, _factory, mut sessions) = mock_manager();
        manager.connect(None).expect("connect");
        let session = sessions.recv().await.expect("session");
        session.open();
        wait_status(&manager, ConnectionStatus::Connected).await;

        let mut feed = manager.messages();
        session.close(false);

        match feed.recv().await {
            Some(Err(err)) => {
                assert!(err.to_string().contains("closed abnormally by remote"));
            }
            other => panic!("expected terminal error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_graceful_remote_close_without_policy_terminates_plainly() {
        let (manager, _factory, mut sessions) = mock_manager();
        manager.connect(None).expect("connect");
        let session = sessions.recv().await.expect("session");
        session.open();
        wait_status(&manager, ConnectionStatus::Connected).await;

        let mut feed = manager.messages();
        session.close(true);

        match feed.recv().await {
            Some(Err(err)) => {
                let rendered = err.to_string();
                assert!(rendered.contains("closed by remote"));
                assert!(!rendered.contains("abnormally"));
            }
            other => panic!("expected terminal error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_deserializer_failure_terminates_feed() {
        let (manager, _factory, mut sessions) = mock_manager();
        manager.connect(None).expect("connect");
        let mut session = sessions.recv().await.expect("session");
        session.open();
        wait_status(&manager, ConnectionStatus::Connected).await;

        let mut feed = manager.messages();
        session.message(r#"{"ok":true}"#);
        match feed.recv().await {
            Some(Ok(value)) => assert_eq!(value, json!({"ok": true})),
            other => panic!("expected message, got {other:?}"),
        }

        // Default deserializer rejects binary frames descriptively.
        session
            .events
            .send(crate::transport::TransportEvent::Message(
                WirePayload::Binary(vec![0xde, 0xad]),
            ))
            .expect("event");

        match feed.recv().await {
            Some(Err(err)) => assert!(err.to_string().contains("binary")),
            other => panic!("expected terminal error, got {other:?}"),
        }
        assert!(feed.recv().await.is_none());
        assert!(session.was_closed());
        assert_eq!(*manager.status().borrow(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_serializer_failure_aborts_only_that_send() {
        let (factory, mut sessions) = MockFactory::new();
        let transport_factory: Arc<dyn TransportFactory> = factory.clone();

        let serializer: Serializer = Arc::new(|value| {
            if value.get("poison").is_some() {
                Err(Error::serialize("poisoned payload"))
            } else {
                Ok(WirePayload::Text(serde_json::to_string(value)?))
            }
        });

        let config = ManagerConfig::new(Url::parse("ws://mock.invalid/ws").expect("url"))
            .with_factory(transport_factory)
            .with_serializer(serializer);
        let manager = ConnectionManager::new(config);

        manager.connect(None).expect("connect");
        let mut session = sessions.recv().await.expect("session");
        session.open();
        wait_status(&manager, ConnectionStatus::Connected).await;

        manager.send(json!({"poison": true}));
        manager.send(json!({"n": 1}));

        // Only the healthy payload reaches the wire; the connection is up.
        assert_eq!(
            session.sent.recv().await,
            Some(WirePayload::Text(r#"{"n":1}"#.to_string()))
        );
        assert_eq!(*manager.status().borrow(), ConnectionStatus::Connected);
    }

    #[tokio::test]
    async fn test_late_subscribers_do_not_replay() {
        let (manager, _factory, mut sessions) = mock_manager();
        manager.connect(None).expect("connect");
        let session = sessions.recv().await.expect("session");
        session.open();
        wait_status(&manager, ConnectionStatus::Connected).await;

        let mut early = manager.messages();
        session.message(r#"{"seq":1}"#);
        match early.recv().await {
            Some(Ok(value)) => assert_eq!(value, json!({"seq": 1})),
            other => panic!("expected message, got {other:?}"),
        }

        let mut late = manager.messages();
        session.message(r#"{"seq":2}"#);

        // The late subscriber sees only the second message.
        match late.recv().await {
            Some(Ok(value)) => assert_eq!(value, json!({"seq": 2})),
            other => panic!("expected message, got {other:?}"),
        }
        match early.recv().await {
            Some(Ok(value)) => assert_eq!(value, json!({"seq": 2})),
            other => panic!("expected message, got {other:?}"),
        }
    }
}
