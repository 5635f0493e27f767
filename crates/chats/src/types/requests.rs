//! Request bodies accepted by the room and message services.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{RoomId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateRoomRequest {
    pub name: String,
    pub label: String,
    /// Members besides the creator, who is always added.
    #[serde(default)]
    pub users: Vec<UserId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct MembersRequest {
    #[serde(default)]
    pub users: Vec<UserId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostMessageRequest {
    pub room: RoomId,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub subject: Option<String>,
}
