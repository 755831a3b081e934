//! HTTP API layer: system endpoints and router composition.

pub mod handlers;

use axum::Router;

use crate::app_state::AppState;

/// Builds the HTTP API router.
pub fn build_router() -> Router<AppState> {
    Router::new().merge(handlers::system::routes())
}
