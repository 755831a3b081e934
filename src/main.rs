//! chat-room server entry point.
//!
//! Starts the room hub and the Axum HTTP server with the WebSocket
//! endpoint.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use chat_room::app_state::AppState;
use chat_room::avatar::TryAvatars;
use chat_room::build_app;
use chat_room::config::ChatConfig;
use chat_room::room::Room;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = ChatConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting chat-room");

    // Start the room
    let (hub, room) = Room::new(config.hub_intake_capacity, config.trace_output.build()?);
    let room_task = tokio::spawn(room.run());

    let avatars = TryAvatars::from_kinds(&config.avatar_strategies, config.avatar_dir.clone());
    tracing::info!(
        strategies = ?config.avatar_strategies,
        outbound_capacity = config.outbound_queue_capacity,
        "room ready; full outbound queues drop messages for that session"
    );

    // Build application state
    let app_state = AppState {
        hub: hub.clone(),
        avatars: Arc::new(avatars),
        session: config.session_settings(),
    };
    let app = build_app(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped; closing room");
    if hub.shutdown().await.is_ok() {
        room_task.await?;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
