//! Request/response style room management for the HTTP surface.

use std::sync::Arc;

use huddle_database::{Room, User};

use super::{require_caller, RoomRegistry};
use crate::types::{ChatError, ChatResult, CreateRoomRequest, MembersRequest, RoomId, RoomSnapshot};

/// Wraps the registry with caller checks. Every call needs an authenticated
/// caller; membership changes additionally need the room creator or a superuser.
pub struct RoomService {
    registry: Arc<RoomRegistry>,
}

impl RoomService {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    pub async fn list_my_rooms(&self, caller: Option<&User>) -> ChatResult<Vec<RoomSnapshot>> {
        let caller = require_caller(caller)?;
        let rooms = self.registry.list_rooms_for_user(caller.id).await?;

        let mut snapshots = Vec::with_capacity(rooms.len());
        for room in rooms {
            let members = self.registry.members(room.id).await?;
            snapshots.push(RoomSnapshot { room, members });
        }
        Ok(snapshots)
    }

    pub async fn create_room(
        &self,
        caller: Option<&User>,
        request: CreateRoomRequest,
    ) -> ChatResult<RoomSnapshot> {
        let caller = require_caller(caller)?;
        self.registry
            .create_room(&request.name, &request.label, caller.id, &request.users)
            .await
    }

    pub async fn add_members(
        &self,
        caller: Option<&User>,
        room_id: RoomId,
        request: MembersRequest,
    ) -> ChatResult<RoomSnapshot> {
        let caller = require_caller(caller)?;
        let room = self.registry.get_room(room_id).await?;
        ensure_can_manage(caller, &room)?;

        self.registry
            .add_members(caller.id, room_id, &request.users)
            .await
    }

    pub async fn remove_members(
        &self,
        caller: Option<&User>,
        room_id: RoomId,
        request: MembersRequest,
    ) -> ChatResult<RoomSnapshot> {
        let caller = require_caller(caller)?;
        if request.users.is_empty() {
            return Err(ChatError::validation("The users list must not be empty."));
        }
        let room = self.registry.get_room(room_id).await?;
        ensure_can_manage(caller, &room)?;

        self.registry.remove_members(room_id, &request.users).await
    }
}

fn ensure_can_manage(caller: &User, room: &Room) -> ChatResult<()> {
    if caller.id == room.creator_id || caller.is_superuser {
        return Ok(());
    }
    Err(ChatError::permission_denied(
        "Only the room creator can change its members.",
    ))
}
