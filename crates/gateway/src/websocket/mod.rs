//! WebSocket endpoints for the gateway

pub mod chat;

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::state::GatewayState;

/// Create all WebSocket routes
pub fn create_websocket_routes() -> Router<Arc<GatewayState>> {
    Router::new().route("/ws/chat/:room", get(chat::chat_websocket_handler))
}
