//! Message REST endpoints

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use huddle_chats::{MessageView, PostMessageRequest, RoomId};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::error::GatewayResult;
use crate::middleware::CurrentUser;
use crate::state::GatewayState;

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListMessagesQuery {
    /// Room to read history from
    pub room: RoomId,
}

/// Create message routes
pub fn create_message_routes() -> Router<Arc<GatewayState>> {
    Router::new().route("/api/messages", get(list_messages).post(create_message))
}

#[utoipa::path(
    get,
    path = "/api/messages",
    tag = "Messages",
    params(ListMessagesQuery),
    responses(
        (status = 200, description = "Most recent messages, oldest first", body = Vec<MessageView>),
        (status = 400, description = "Caller is not in the room", body = crate::error::ErrorResponse),
        (status = 403, description = "Not authenticated", body = crate::error::ErrorResponse),
        (status = 404, description = "Room not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_messages(
    State(state): State<Arc<GatewayState>>,
    CurrentUser(caller): CurrentUser,
    query: Result<Query<ListMessagesQuery>, QueryRejection>,
) -> GatewayResult<Json<Vec<MessageView>>> {
    let Query(query) = query?;
    let messages = state
        .services
        .messages
        .list_messages(caller.as_ref(), query.room)
        .await?;

    Ok(Json(messages.iter().map(MessageView::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/messages",
    tag = "Messages",
    request_body = PostMessageRequest,
    responses(
        (status = 201, description = "Message stored and broadcast to the room", body = MessageView),
        (status = 400, description = "Blank message or caller is not in the room", body = crate::error::ErrorResponse),
        (status = 403, description = "Not authenticated", body = crate::error::ErrorResponse),
        (status = 404, description = "Room not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_message(
    State(state): State<Arc<GatewayState>>,
    CurrentUser(caller): CurrentUser,
    payload: Result<Json<PostMessageRequest>, JsonRejection>,
) -> GatewayResult<impl IntoResponse> {
    let Json(request) = payload?;
    let message = state
        .services
        .messages
        .create_message(caller.as_ref(), request)
        .await?;

    Ok((StatusCode::CREATED, Json(MessageView::from(&message))))
}
