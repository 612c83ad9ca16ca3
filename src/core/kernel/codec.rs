use crate::core::errors::ClientError;
use tokio_tungstenite::tungstenite::Message;

/// Codec trait for the service-specific WebSocket message framing
///
/// Converts between raw WebSocket messages and typed application messages.
/// Control frames (ping, pong, close) never reach the codec; they are handled
/// at the transport level.
pub trait WsCodec: Send + Sync + 'static {
    /// The type representing decoded application messages
    type Message: Send + Sync;

    /// Encode the periodic keepalive frame
    fn encode_keepalive(&self) -> Result<Message, ClientError>;

    /// Decode a raw WebSocket message into a typed message
    ///
    /// # Returns
    /// - `Ok(Some(message))` - Successfully decoded message
    /// - `Ok(None)` - Message was ignored/filtered by the codec
    /// - `Err(error)` - Failed to decode message
    fn decode_message(&self, message: Message) -> Result<Option<Self::Message>, ClientError>;
}
