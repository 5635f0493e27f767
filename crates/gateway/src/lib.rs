//! # Huddle Gateway Crate
//!
//! HTTP REST and WebSocket surface of the Huddle chat backend. Requests are
//! routed to the room and message services in `huddle-chats`; live
//! connections are driven through `ChatSession`.
//!
//! ## Architecture
//!
//! - **REST**: room and message endpoints with OpenAPI documentation
//! - **WebSocket**: `/ws/chat/{room}`, one connection bound to one room
//! - **State**: the shared services and the token authenticator
//! - **Middleware**: token resolution and request logging
//!
//! ## Usage
//!
//! ```rust,no_run
//! # async fn demo(pool: sqlx::SqlitePool) -> std::io::Result<()> {
//! use huddle_gateway::{create_router, GatewayState};
//!
//! let state = GatewayState::from_pool(pool, &huddle_config::AppConfig::default());
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:7070").await?;
//! axum::serve(listener, app).await
//! # }
//! ```

pub mod error;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod websocket;

pub use error::{ErrorResponse, GatewayError, GatewayResult};
pub use middleware::CurrentUser;
pub use state::GatewayState;

use std::sync::Arc;

use axum::{http::Method, middleware as axum_middleware, Router};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        rest::health::health_check,
        rest::rooms::list_rooms,
        rest::rooms::create_room,
        rest::rooms::add_members,
        rest::rooms::remove_members,
        rest::messages::list_messages,
        rest::messages::create_message,
    ),
    components(
        schemas(
            rest::health::HealthResponse,
            rest::messages::ListMessagesQuery,
            huddle_chats::CreateRoomRequest,
            huddle_chats::MembersRequest,
            huddle_chats::PostMessageRequest,
            huddle_chats::RoomDetails,
            huddle_chats::RoomView,
            huddle_chats::MemberView,
            huddle_chats::MessageView,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Health", description = "Liveness"),
        (name = "Rooms", description = "Room creation and membership"),
        (name = "Messages", description = "Room message history"),
    )
)]
pub struct ApiDoc;

/// Create the main application router with all routes
pub fn create_router(state: GatewayState) -> Router {
    let state = Arc::new(state);

    #[allow(unused_mut)]
    let mut router = Router::new()
        .merge(rest::create_rest_routes())
        .merge(websocket::create_websocket_routes())
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::identity_middleware,
        ))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::DELETE])
                .allow_headers(Any),
        )
        .layer(axum_middleware::from_fn(middleware::logging_middleware));

    // Swagger UI only in debug builds
    #[cfg(debug_assertions)]
    {
        router = router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", ApiDoc::openapi()),
        );
    }

    router
}
