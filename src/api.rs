use crate::session::RoomRegistry;
use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddrV4;
use tokio::net::TcpListener;

pub fn make_router(registry: &'static RoomRegistry) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
        .route("/rooms", get(get_rooms))
        .with_state(registry)
}

/// Serves the HTTP endpoints until the listener fails.
pub async fn serve(addr: SocketAddrV4, registry: &'static RoomRegistry) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    log::info!("HTTP API listening on {}", listener.local_addr()?);
    axum::serve(listener, make_router(registry)).await
}

async fn banner() -> &'static str {
    "Mafia Nights Server is running!"
}

async fn health() -> &'static str {
    "ok"
}

async fn get_rooms(State(registry): State<&'static RoomRegistry>) -> Json<Value> {
    Json(json!({
        "num_rooms": registry.num_rooms(),
        "rooms": registry.summaries()
    }))
}
