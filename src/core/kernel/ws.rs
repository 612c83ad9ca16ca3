use crate::core::config::{WsConfig, HANDSHAKE_HEADERS};
use crate::core::errors::ClientError;
use crate::core::kernel::codec::WsCodec;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, http::HeaderValue, protocol::Message},
};
use tracing::{instrument, warn};

/// WebSocket session trait - pure transport layer
///
/// Kept deliberately small so tests can substitute a scripted session for the
/// real transport.
#[async_trait]
pub trait WsSession<C: WsCodec>: Send + Sync {
    /// Open the WebSocket handshake
    async fn connect(&mut self) -> Result<(), ClientError>;

    /// Send one keepalive frame, encoded by the codec
    async fn send_keepalive(&mut self) -> Result<(), ClientError>;

    /// Get the next decoded message
    ///
    /// `None` means the stream ended (server close or EOF). A
    /// `DeserializationError` leaves the session open; any other error means
    /// the transport is gone.
    async fn next_message(&mut self) -> Option<Result<C::Message, ClientError>>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), ClientError>;

    /// Check if the connection is alive
    fn is_connected(&self) -> bool;
}

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Tungstenite-based WebSocket session
pub struct TungsteniteWs<C: WsCodec> {
    url: String,
    label: String,
    codec: C,
    connect_timeout: Duration,
    write: Option<futures_util::stream::SplitSink<WsStream, Message>>,
    read: Option<futures_util::stream::SplitStream<WsStream>>,
    connected: bool,
}

impl<C: WsCodec> TungsteniteWs<C> {
    /// Create a new WebSocket session
    ///
    /// # Arguments
    /// * `url` - The full session URL, credential and version included
    /// * `label` - Account label for logging/tracing
    /// * `codec` - The codec handling message encoding/decoding
    pub fn new(url: String, label: String, codec: C, config: &WsConfig) -> Self {
        Self {
            url,
            label,
            codec,
            connect_timeout: config.connect_timeout(),
            write: None,
            read: None,
            connected: false,
        }
    }

    async fn send_raw(&mut self, msg: Message) -> Result<(), ClientError> {
        if !self.connected {
            return Err(ClientError::NetworkError(
                "WebSocket not connected".to_string(),
            ));
        }

        let write = self.write.as_mut().ok_or_else(|| {
            ClientError::NetworkError("WebSocket write stream not available".to_string())
        })?;

        write.send(msg).await.map_err(|e| {
            self.connected = false;
            ClientError::NetworkError(format!("Failed to send WebSocket message: {}", e))
        })?;

        Ok(())
    }

    /// Next data frame, with control messages handled at the transport level.
    /// Returns `None` once the stream has ended or a close frame arrived.
    async fn next_raw(&mut self) -> Option<Result<Message, ClientError>> {
        loop {
            if !self.connected {
                return None;
            }

            let next = {
                let read = self.read.as_mut()?;
                read.next().await
            };

            match next {
                Some(Ok(Message::Close(_))) | None => {
                    self.connected = false;
                    return None;
                }
                Some(Ok(Message::Ping(data))) => {
                    // Respond to pings at transport level
                    if let Err(e) = self.send_raw(Message::Pong(data)).await {
                        warn!(account = %self.label, "Failed to send pong response: {}", e);
                    }
                }
                Some(Ok(Message::Pong(_))) => {}
                Some(Ok(message)) => return Some(Ok(message)),
                Some(Err(e)) => {
                    self.connected = false;
                    return Some(Err(ClientError::NetworkError(format!(
                        "WebSocket error: {}",
                        e
                    ))));
                }
            }
        }
    }
}

#[async_trait]
impl<C: WsCodec> WsSession<C> for TungsteniteWs<C> {
    #[instrument(skip(self), fields(account = %self.label))]
    async fn connect(&mut self) -> Result<(), ClientError> {
        self.write = None;
        self.read = None;
        self.connected = false;

        let mut request = self.url.as_str().into_client_request().map_err(|e| {
            ClientError::NetworkError(format!("Invalid WebSocket request: {}", e))
        })?;
        let headers = request.headers_mut();
        for (name, value) in HANDSHAKE_HEADERS {
            headers.insert(name, HeaderValue::from_static(value));
        }

        let connection_future = tokio::time::timeout(self.connect_timeout, connect_async(request));

        let (ws_stream, _) = connection_future
            .await
            .map_err(|_| {
                ClientError::ConnectionTimeout("WebSocket connection timeout".to_string())
            })?
            .map_err(|e| {
                ClientError::NetworkError(format!("WebSocket connection failed: {}", e))
            })?;

        let (write, read) = ws_stream.split();
        self.write = Some(write);
        self.read = Some(read);
        self.connected = true;

        Ok(())
    }

    #[instrument(skip(self), fields(account = %self.label))]
    async fn send_keepalive(&mut self) -> Result<(), ClientError> {
        let frame = self.codec.encode_keepalive()?;
        self.send_raw(frame).await
    }

    #[instrument(skip(self), fields(account = %self.label))]
    async fn next_message(&mut self) -> Option<Result<C::Message, ClientError>> {
        loop {
            match self.next_raw().await {
                Some(Ok(raw_msg)) => {
                    // Decode the message using the codec
                    match self.codec.decode_message(raw_msg) {
                        Ok(Some(decoded)) => return Some(Ok(decoded)),
                        Ok(None) => {} // Codec chose to ignore this message
                        Err(e) => return Some(Err(e)),
                    }
                }
                Some(Err(e)) => return Some(Err(e)),
                None => return None,
            }
        }
    }

    #[instrument(skip(self), fields(account = %self.label))]
    async fn close(&mut self) -> Result<(), ClientError> {
        if let Some(write) = self.write.as_mut() {
            let _ = write.send(Message::Close(None)).await;
        }
        self.connected = false;
        self.write = None;
        self.read = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
