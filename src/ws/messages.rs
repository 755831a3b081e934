//! WebSocket wire frames.
//!
//! Clients send `{"message": "..."}` as a text (or binary) JSON frame.
//! Any other fields they include are ignored: the author, avatar, and
//! timestamp are always stamped server-side. The server sends every
//! [`ChatMessage`] back as a JSON text frame.

use axum::extract::ws::Message;
use serde::Deserialize;

use crate::domain::ChatMessage;
use crate::error::ChatError;

/// Client → server chat frame.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundFrame {
    /// Message body.
    pub message: String,
}

/// What an inbound WebSocket frame means to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A chat message body.
    Chat(String),
    /// Ping or pong; nothing to do.
    Control,
    /// The peer is closing the connection.
    Close,
}

/// Decodes one inbound frame.
///
/// # Errors
///
/// Returns [`ChatError::Codec`] if a data frame is not a valid
/// [`InboundFrame`].
pub fn decode(frame: &Message) -> Result<Inbound, ChatError> {
    match frame {
        Message::Text(text) => {
            let frame: InboundFrame = serde_json::from_str(text.as_str())?;
            Ok(Inbound::Chat(frame.message))
        }
        Message::Binary(bytes) => {
            let frame: InboundFrame = serde_json::from_slice(bytes)?;
            Ok(Inbound::Chat(frame.message))
        }
        Message::Ping(_) | Message::Pong(_) => Ok(Inbound::Control),
        Message::Close(_) => Ok(Inbound::Close),
    }
}

/// Encodes a message as an outbound text frame.
///
/// # Errors
///
/// Returns [`ChatError::Codec`] if serialization fails.
pub fn encode(message: &ChatMessage) -> Result<Message, ChatError> {
    Ok(Message::text(serde_json::to_string(message)?))
}
