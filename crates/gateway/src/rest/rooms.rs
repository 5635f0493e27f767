//! Room REST endpoints

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use huddle_chats::{CreateRoomRequest, MembersRequest, RoomDetails, RoomId};

use crate::error::GatewayResult;
use crate::middleware::CurrentUser;
use crate::state::GatewayState;

/// Create room routes
pub fn create_room_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/api/rooms", get(list_rooms).post(create_room))
        .route(
            "/api/rooms/:room_id/members",
            post(add_members).delete(remove_members),
        )
}

#[utoipa::path(
    get,
    path = "/api/rooms",
    tag = "Rooms",
    responses(
        (status = 200, description = "Rooms the caller belongs to, most recently active first", body = Vec<RoomDetails>),
        (status = 403, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_rooms(
    State(state): State<Arc<GatewayState>>,
    CurrentUser(caller): CurrentUser,
) -> GatewayResult<Json<Vec<RoomDetails>>> {
    let rooms = state.services.rooms.list_my_rooms(caller.as_ref()).await?;
    Ok(Json(rooms.iter().map(RoomDetails::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/rooms",
    tag = "Rooms",
    request_body = CreateRoomRequest,
    responses(
        (status = 201, description = "Room created", body = RoomDetails),
        (status = 400, description = "Invalid room or members are not friends of the caller", body = crate::error::ErrorResponse),
        (status = 403, description = "Not authenticated", body = crate::error::ErrorResponse),
        (status = 404, description = "Unknown user", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_room(
    State(state): State<Arc<GatewayState>>,
    CurrentUser(caller): CurrentUser,
    payload: Result<Json<CreateRoomRequest>, JsonRejection>,
) -> GatewayResult<impl IntoResponse> {
    let Json(request) = payload?;
    let snapshot = state
        .services
        .rooms
        .create_room(caller.as_ref(), request)
        .await?;

    Ok((StatusCode::CREATED, Json(RoomDetails::from(&snapshot))))
}

#[utoipa::path(
    post,
    path = "/api/rooms/{room_id}/members",
    tag = "Rooms",
    params(("room_id" = i64, Path, description = "Room id")),
    request_body = MembersRequest,
    responses(
        (status = 200, description = "Members added", body = RoomDetails),
        (status = 400, description = "Already a member, not a friend, or room full", body = crate::error::ErrorResponse),
        (status = 403, description = "Caller is not the creator or a superuser", body = crate::error::ErrorResponse),
        (status = 404, description = "Room or user not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn add_members(
    State(state): State<Arc<GatewayState>>,
    CurrentUser(caller): CurrentUser,
    room_id: Result<Path<RoomId>, PathRejection>,
    payload: Result<Json<MembersRequest>, JsonRejection>,
) -> GatewayResult<Json<RoomDetails>> {
    let Path(room_id) = room_id?;
    let Json(request) = payload?;
    let snapshot = state
        .services
        .rooms
        .add_members(caller.as_ref(), room_id, request)
        .await?;

    Ok(Json(RoomDetails::from(&snapshot)))
}

#[utoipa::path(
    delete,
    path = "/api/rooms/{room_id}/members",
    tag = "Rooms",
    params(("room_id" = i64, Path, description = "Room id")),
    request_body = MembersRequest,
    responses(
        (status = 200, description = "Members removed", body = RoomDetails),
        (status = 400, description = "Empty list or target is not a member", body = crate::error::ErrorResponse),
        (status = 403, description = "Caller is not the creator or a superuser", body = crate::error::ErrorResponse),
        (status = 404, description = "Room not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn remove_members(
    State(state): State<Arc<GatewayState>>,
    CurrentUser(caller): CurrentUser,
    room_id: Result<Path<RoomId>, PathRejection>,
    payload: Result<Json<MembersRequest>, JsonRejection>,
) -> GatewayResult<Json<RoomDetails>> {
    let Path(room_id) = room_id?;
    let Json(request) = payload?;
    let snapshot = state
        .services
        .rooms
        .remove_members(caller.as_ref(), room_id, request)
        .await?;

    Ok(Json(RoomDetails::from(&snapshot)))
}
