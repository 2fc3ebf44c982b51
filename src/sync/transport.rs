/// Upstream transport seam
///
/// The engine only needs "open / send / receive / close". `WebSocketTransport`
/// is the production implementation; tests substitute a scripted transport.
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use crate::errors::TransportError;
use crate::logger::{self, LogTag};

#[async_trait]
pub trait Transport: Send + Sync {
    /// Open one session to `endpoint`
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn TransportSession>, TransportError>;
}

#[async_trait]
pub trait TransportSession: Send {
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Next text frame; `None` once the peer closed the session
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;

    async fn close(&mut self);
}

// ============================================================================
// WEBSOCKET TRANSPORT
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        Self
    }
}

/// Check that an endpoint is an absolute ws:// or wss:// URL
pub fn validate_endpoint(endpoint: &str) -> Result<url::Url, TransportError> {
    let parsed = url::Url::parse(endpoint).map_err(|e| TransportError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "ws" | "wss" => Ok(parsed),
        other => Err(TransportError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn TransportSession>, TransportError> {
        let url = validate_endpoint(endpoint)?;

        logger::debug(LogTag::Transport, &format!("Opening WebSocket to {}", url));

        let (stream, response) =
            connect_async(url.as_str())
                .await
                .map_err(|e| TransportError::ConnectFailed {
                    endpoint: endpoint.to_string(),
                    reason: e.to_string(),
                })?;

        logger::debug(
            LogTag::Transport,
            &format!("WebSocket handshake complete (status={})", response.status()),
        );

        Ok(Box::new(WebSocketSession { stream }))
    }
}

struct WebSocketSession {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl TransportSession for WebSocketSession {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| TransportError::SendFailed {
                reason: e.to_string(),
            })
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Binary(bytes)) => {
                    return Some(String::from_utf8(bytes).map_err(|e| TransportError::Protocol {
                        reason: format!("binary frame is not UTF-8: {}", e),
                    }));
                }
                Ok(Message::Close(frame)) => {
                    logger::debug(
                        LogTag::Transport,
                        &format!("Peer closed WebSocket: {:?}", frame),
                    );
                    return None;
                }
                // Ping/pong are answered by tungstenite itself
                Ok(_) => continue,
                Err(e) => {
                    return Some(Err(TransportError::Closed {
                        reason: e.to_string(),
                    }))
                }
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            logger::debug(LogTag::Transport, &format!("WebSocket close error: {}", e));
        }
    }
}
