//! Default WebSocket transport over `tokio-tungstenite`.
//!
//! [`WebSocketFactory`] dials the configured URL with `connect_async` and
//! wraps the socket in a [`WebSocketTransport`]. Since a resolved handshake
//! means the socket is open, the transport synthesizes the single `Opened`
//! event as its first `recv` result, satisfying the transport contract.
//!
//! Protocol-level frames are absorbed here: `Ping` is answered with `Pong`,
//! `Pong` is ignored, and `Close` frames are mapped to
//! [`TransportEvent::Closed`] with gracefulness derived from the close code.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Error, Result};

use super::{Transport, TransportEvent, TransportFactory, WirePayload};

// ============================================================================
// WebSocketFactory
// ============================================================================

/// Opens [`WebSocketTransport`] instances with `connect_async`.
///
/// Stateless; the connection manager calls `open` once per attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketFactory;

#[async_trait]
impl TransportFactory for WebSocketFactory {
    async fn open(&self, url: &Url, protocols: &[String]) -> Result<Box<dyn Transport>> {
        let mut request = url.as_str().into_client_request()?;

        if !protocols.is_empty() {
            let value = HeaderValue::from_str(&protocols.join(", "))
                .map_err(|e| Error::transport(format!("invalid subprotocol header: {e}")))?;
            request.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, value);
        }

        let (socket, _response) = connect_async(request).await?;
        debug!(%url, "WebSocket handshake completed");

        Ok(Box::new(WebSocketTransport {
            socket,
            opened_emitted: false,
            closed: false,
        }))
    }
}

// ============================================================================
// WebSocketTransport
// ============================================================================

/// A connected client-side WebSocket.
pub struct WebSocketTransport {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    opened_emitted: bool,
    closed: bool,
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn recv(&mut self) -> Option<TransportEvent> {
        if !self.opened_emitted {
            self.opened_emitted = true;
            return Some(TransportEvent::Opened);
        }

        loop {
            match self.socket.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Some(TransportEvent::Message(WirePayload::Text(text.to_string())));
                }

                Some(Ok(Message::Binary(bytes))) => {
                    return Some(TransportEvent::Message(WirePayload::Binary(bytes.to_vec())));
                }

                Some(Ok(Message::Ping(payload))) => {
                    trace!("ping received");
                    if let Err(e) = self.socket.send(Message::Pong(payload)).await {
                        warn!(error = %e, "failed to answer ping");
                    }
                }

                Some(Ok(Message::Close(frame))) => {
                    let graceful = frame
                        .as_ref()
                        .is_none_or(|f| f.code == CloseCode::Normal);
                    let reason = frame.map(|f| f.reason.to_string());
                    debug!(graceful, ?reason, "WebSocket closed by remote");
                    return Some(TransportEvent::Closed { graceful, reason });
                }

                // Pong and raw frames carry no payload for consumers.
                Some(Ok(_)) => {}

                Some(Err(e)) => return Some(TransportEvent::Errored(e.to_string())),

                None => return None,
            }
        }
    }

    async fn send(&mut self, payload: WirePayload) -> Result<()> {
        let message = match payload {
            WirePayload::Text(text) => Message::Text(text.into()),
            WirePayload::Binary(bytes) => Message::Binary(bytes.into()),
        };
        self.socket.send(message).await?;
        Ok(())
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "client disconnect".into(),
        };
        if let Err(e) = self.socket.close(Some(frame)).await {
            trace!(error = %e, "close handshake incomplete");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
