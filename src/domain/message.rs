//! The chat message fanned out by the room.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One chat utterance.
///
/// Built by the receiving session, never taken from the wire as-is: the
/// author, avatar, and timestamp are always stamped server-side. Once
/// built it is shared read-only (behind an `Arc`) with every recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Display name of the author.
    pub name: String,
    /// Message body.
    pub message: String,
    /// Time the server received the message.
    pub when: DateTime<Utc>,
    /// Avatar reference of the author (URL or empty).
    pub avatar_url: String,
}

impl ChatMessage {
    /// Creates a message stamped with the current time.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        message: impl Into<String>,
        avatar_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            when: Utc::now(),
            avatar_url: avatar_url.into(),
        }
    }
}

/// Display attributes bound to a session when it is accepted.
///
/// Every message the session sends is stamped with these, whatever the
/// client put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    /// Display name.
    pub name: String,
    /// Resolved avatar reference (may be empty).
    pub avatar_url: String,
}

impl Author {
    /// Creates an author.
    #[must_use]
    pub fn new(name: impl Into<String>, avatar_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            avatar_url: avatar_url.into(),
        }
    }

    /// Builds a message from `body`, stamped with this author and the
    /// current time.
    #[must_use]
    pub fn compose(&self, body: impl Into<String>) -> ChatMessage {
        ChatMessage::new(self.name.clone(), body, self.avatar_url.clone())
    }
}
