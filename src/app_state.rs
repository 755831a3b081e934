//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::avatar::AvatarResolver;
use crate::room::Hub;
use crate::ws::session::SessionSettings;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Handle on the room hub.
    pub hub: Hub,
    /// Avatar strategy used when a session is accepted.
    pub avatars: Arc<dyn AvatarResolver>,
    /// Per-session queue and timeout settings.
    pub session: SessionSettings,
}
