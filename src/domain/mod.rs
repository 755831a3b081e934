//! Domain layer: session identity and the chat message model.

pub mod identity;
pub mod message;
pub mod session_id;

pub use identity::{AUTH_COOKIE, Identity};
pub use message::{Author, ChatMessage};
pub use session_id::SessionId;
