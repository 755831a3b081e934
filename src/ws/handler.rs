//! Axum WebSocket upgrade handler for the room.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{FromRequestParts, State};
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use axum::response::IntoResponse;
use futures_util::StreamExt;

use super::session::run_session;
use crate::app_state::AppState;
use crate::avatar::AvatarResolver;
use crate::domain::{Author, Identity};
use crate::error::ChatError;

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ChatError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let cookies = parts
            .headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect::<Vec<_>>()
            .join("; ");
        Identity::from_cookie_header(&cookies)
    }
}

/// `GET /room` — Join the chat room over WebSocket.
///
/// Requires the `auth` cookie set by the login flow; without it the
/// request is rejected with `401` before any upgrade happens.
pub async fn room_handler(
    identity: Identity,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let avatar_url = resolve_avatar(Arc::clone(&state.avatars), &identity).await;
    let author = Author::new(identity.name, avatar_url);
    let hub = state.hub.clone();
    let settings = state.session;

    ws.on_upgrade(move |socket| {
        let (sink, stream) = socket.split();
        run_session(sink, stream, hub, author, settings)
    })
}

/// Resolves the avatar for `identity` off the async workers.
///
/// Strategies may touch the file system, so resolution runs on the
/// blocking pool. Any failure yields an empty avatar.
async fn resolve_avatar(avatars: Arc<dyn AvatarResolver>, identity: &Identity) -> String {
    let user = identity.clone();
    match tokio::task::spawn_blocking(move || avatars.avatar_url(&user)).await {
        Ok(Ok(url)) => url,
        Ok(Err(e)) => {
            tracing::debug!(user_id = %identity.user_id, error = %e, "no avatar for user");
            String::new()
        }
        Err(e) => {
            tracing::warn!(user_id = %identity.user_id, error = %e, "avatar lookup task failed");
            String::new()
        }
    }
}
