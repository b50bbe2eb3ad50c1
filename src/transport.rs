//! Transport seam between the status channel and the network.
//!
//! The channel only needs three things from a connection: open it, read the
//! next text frame, close it. [`WsTransport`] provides them over
//! `tokio-tungstenite`; tests substitute scripted transports.

use futures_util::future::BoxFuture;
use futures_util::{FutureExt, StreamExt};
use reqwest::Url;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::trace;

use crate::endpoint::redacted_url;
use crate::error::RemoteError;

/// One live duplex connection.
pub trait Connection: Send {
    /// Resolve with the next text payload, or `None` once the connection has
    /// closed for any reason (close frame, stream error, EOF).
    fn next_text(&mut self) -> BoxFuture<'_, Option<String>>;

    /// Close the connection. Must be safe to call on an already closed one.
    fn close(&mut self) -> BoxFuture<'_, ()>;
}

/// Something that can open [`Connection`]s.
pub trait Transport: Send + Sync + 'static {
    type Conn: Connection + 'static;

    /// Open a connection to `url`. Failure is reported as an error, which the
    /// channel treats exactly like a closure.
    fn connect<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<Self::Conn, RemoteError>>;
}

// ---------------------------------------------------------------------------
// WebSocket transport
// ---------------------------------------------------------------------------

/// Production transport: a WebSocket per connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsTransport;

/// A WebSocket opened by [`WsTransport`].
pub struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

impl Transport for WsTransport {
    type Conn = WsConnection;

    fn connect<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<WsConnection, RemoteError>> {
        async move {
            let (stream, _response) = tokio_tungstenite::connect_async(url.as_str())
                .await
                .map_err(|e| RemoteError::Connect {
                    url: redacted_url(url),
                    detail: e.to_string(),
                })?;
            Ok(WsConnection {
                stream,
                closed: false,
            })
        }
        .boxed()
    }
}

impl Connection for WsConnection {
    fn next_text(&mut self) -> BoxFuture<'_, Option<String>> {
        async move {
            if self.closed {
                return None;
            }
            loop {
                match self.stream.next().await {
                    Some(Ok(WsMessage::Text(text))) => return Some(text),
                    Some(Ok(WsMessage::Close(frame))) => {
                        trace!(?frame, "close frame received");
                        self.closed = true;
                        return None;
                    }
                    // Binary, ping, pong and raw frames carry no control signal.
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        trace!(error = %e, "websocket read failed");
                        self.closed = true;
                        return None;
                    }
                    None => {
                        self.closed = true;
                        return None;
                    }
                }
            }
        }
        .boxed()
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        async move {
            if self.closed {
                return;
            }
            self.closed = true;
            let _ = self.stream.close(None).await;
        }
        .boxed()
    }
}
