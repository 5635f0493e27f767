//! Read models shared by the realtime protocol and the HTTP surface.

use huddle_database::{Message, Room, User};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{RoomId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RoomView {
    pub id: RoomId,
    pub name: String,
    pub label: String,
    pub creator: UserId,
    pub latest_message: String,
    pub created: String,
    pub updated: String,
}

impl From<&Room> for RoomView {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id,
            name: room.name.clone(),
            label: room.label.clone(),
            creator: room.creator_id,
            latest_message: room.latest_message.clone(),
            created: room.created_at.clone(),
            updated: room.updated_at.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MemberView {
    pub id: UserId,
    pub username: String,
    pub is_online: bool,
}

impl From<&User> for MemberView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            is_online: user.is_online,
        }
    }
}

/// A chat message as clients see it; `user` carries the sender's username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MessageView {
    pub id: i64,
    pub room: RoomId,
    pub user_id: UserId,
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub message: String,
    pub created: String,
}

impl From<&Message> for MessageView {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            room: message.room_id,
            user_id: message.user_id,
            user: message.username.clone(),
            subject: message.subject.clone(),
            message: message.message.clone(),
            created: message.created_at.clone(),
        }
    }
}

/// A room together with its member set, in join order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub room: Room,
    pub members: Vec<User>,
}

impl RoomSnapshot {
    pub fn member_ids(&self) -> Vec<UserId> {
        self.members.iter().map(|user| user.id).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RoomDetails {
    pub room: RoomView,
    pub users: Vec<MemberView>,
}

impl From<&RoomSnapshot> for RoomDetails {
    fn from(snapshot: &RoomSnapshot) -> Self {
        Self {
            room: RoomView::from(&snapshot.room),
            users: snapshot.members.iter().map(MemberView::from).collect(),
        }
    }
}
