//! WebSocket layer: connection acceptance, session pumps, wire frames.
//!
//! The endpoint at `/room` upgrades an authenticated request and runs a
//! session bound to the room hub until the connection goes away.

pub mod handler;
pub mod messages;
pub mod session;

use axum::Router;
use axum::routing::get;

use crate::app_state::AppState;

/// Room routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/room", get(handler::room_handler))
}
