use crate::core::errors::ClientError;
use crate::core::kernel::WsCodec;
use crate::core::types::{ServerEvent, StatusFrame, MSG_CONNECT, MSG_PING, MSG_PULSE};
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;

/// Codec for the status/keepalive protocol spoken by the remote service.
pub struct PulseCodec;

impl WsCodec for PulseCodec {
    type Message = ServerEvent;

    fn encode_keepalive(&self) -> Result<Message, ClientError> {
        let ping = json!({ "type": MSG_PING });
        Ok(Message::Text(ping.to_string()))
    }

    fn decode_message(&self, message: Message) -> Result<Option<Self::Message>, ClientError> {
        let text = match message {
            Message::Text(text) => text,
            Message::Binary(data) => String::from_utf8(data).map_err(|e| {
                ClientError::DeserializationError(format!(
                    "Invalid UTF-8 in binary message: {}",
                    e
                ))
            })?,
            _ => return Ok(None), // Ignore other message types
        };

        let value: Value = serde_json::from_str(&text).map_err(|e| {
            ClientError::DeserializationError(format!("Failed to parse JSON: {}", e))
        })?;

        // Unknown discriminators (and frames without one) are dropped without
        // touching connection state.
        match value.get("message").and_then(|m| m.as_str()) {
            Some(MSG_CONNECT) => Self::decode_status(&value).map(|f| Some(ServerEvent::Connected(f.into()))),
            Some(MSG_PULSE) => Self::decode_status(&value).map(|f| Some(ServerEvent::Pulse(f.into()))),
            _ => Ok(None),
        }
    }
}

impl PulseCodec {
    fn decode_status(value: &Value) -> Result<StatusFrame, ClientError> {
        serde_json::from_value(value.clone()).map_err(|e| {
            ClientError::DeserializationError(format!("Failed to parse status frame: {}", e))
        })
    }
}
