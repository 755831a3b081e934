//! # chat-room
//!
//! Real-time WebSocket chat room.
//!
//! Every connected session sends chat messages to a single room hub,
//! which fans each message out to all sessions currently in the room.
//! Membership changes and broadcasts are serialized through one control
//! loop, so a broadcast always reaches exactly the sessions that were
//! members when it was processed.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket /room, HTTP /health)
//!     │
//!     ├── Connection acceptor (ws/handler)
//!     │       └── Identity (auth cookie) + AvatarResolver (avatar/)
//!     │
//!     ├── Session pumps (ws/session)
//!     │       inbound ──► Hub ──► outbound queue ──► outbound
//!     │
//!     └── Room control loop (room/)
//!             └── Tracer (trace/)
//! ```

pub mod api;
pub mod app_state;
pub mod avatar;
pub mod config;
pub mod domain;
pub mod error;
pub mod room;
pub mod trace;
pub mod ws;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// Builds the full application router: `/health` and `/room`.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(api::build_router())
        .merge(ws::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
