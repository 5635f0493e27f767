//! REST API endpoints for the gateway

pub mod health;
pub mod messages;
pub mod rooms;

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::state::GatewayState;

/// Create all REST API routes
pub fn create_rest_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .merge(rooms::create_room_routes())
        .merge(messages::create_message_routes())
}
