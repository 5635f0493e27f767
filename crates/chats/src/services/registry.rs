//! Rooms, their member sets, and the rules that govern them.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use huddle_config::ChatConfig;
use huddle_database::{
    CreateRoomRequest as NewRoom, DatabaseError, FriendRepository, MemberRepository, Room,
    RoomRepository, User, UserRepository,
};
use sqlx::SqlitePool;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::info;

use crate::repositories::{FriendshipOracle, UserDirectory};
use crate::types::{ChatError, ChatResult, RoomId, RoomSnapshot, UserId};
use crate::utils::validation::{dedup_preserving_order, Validator};

/// Lazily created per-room mutexes that serialize membership changes.
#[derive(Default)]
struct RoomLocks {
    locks: Mutex<HashMap<RoomId, Arc<Mutex<()>>>>,
}

impl RoomLocks {
    async fn acquire(&self, room_id: RoomId) -> OwnedMutexGuard<()> {
        let lock = self.locks.lock().await.entry(room_id).or_default().clone();
        lock.lock_owned().await
    }
}

/// Owns room membership. Every mutation of one room's member set runs under
/// that room's lock and commits in a single transaction.
pub struct RoomRegistry {
    rooms: RoomRepository,
    members: MemberRepository,
    users: Arc<dyn UserDirectory>,
    friends: Arc<dyn FriendshipOracle>,
    locks: RoomLocks,
    max_members: usize,
}

impl RoomRegistry {
    /// Registry backed entirely by the SQLite repositories.
    pub fn new(pool: SqlitePool, config: &ChatConfig) -> Self {
        Self::with_collaborators(
            pool.clone(),
            Arc::new(UserRepository::new(pool.clone())),
            Arc::new(FriendRepository::new(pool)),
            config.max_room_members,
        )
    }

    pub fn with_collaborators(
        pool: SqlitePool,
        users: Arc<dyn UserDirectory>,
        friends: Arc<dyn FriendshipOracle>,
        max_members: usize,
    ) -> Self {
        Self {
            rooms: RoomRepository::new(pool.clone()),
            members: MemberRepository::new(pool),
            users,
            friends,
            locks: RoomLocks::default(),
            max_members,
        }
    }

    pub fn max_members(&self) -> usize {
        self.max_members
    }

    pub async fn get_room(&self, room_id: RoomId) -> ChatResult<Room> {
        self.rooms
            .find_by_id(room_id)
            .await?
            .ok_or_else(ChatError::room_not_found)
    }

    pub async fn snapshot(&self, room_id: RoomId) -> ChatResult<RoomSnapshot> {
        let room = self.get_room(room_id).await?;
        let members = self.members.members(room_id).await?;
        Ok(RoomSnapshot { room, members })
    }

    pub async fn members(&self, room_id: RoomId) -> ChatResult<Vec<User>> {
        self.get_room(room_id).await?;
        Ok(self.members.members(room_id).await?)
    }

    pub async fn member_ids(&self, room_id: RoomId) -> ChatResult<Vec<UserId>> {
        self.get_room(room_id).await?;
        Ok(self.members.member_ids(room_id).await?)
    }

    /// `NotFound` when the room does not exist.
    pub async fn is_member(&self, room_id: RoomId, user_id: UserId) -> ChatResult<bool> {
        self.get_room(room_id).await?;
        Ok(self.members.is_member(room_id, user_id).await?)
    }

    /// Rooms the user belongs to, most recently active first.
    pub async fn list_rooms_for_user(&self, user_id: UserId) -> ChatResult<Vec<Room>> {
        Ok(self.rooms.list_for_user(user_id).await?)
    }

    pub async fn record_activity(&self, room_id: RoomId, latest_message: &str) -> ChatResult<()> {
        self.rooms
            .record_activity(room_id, latest_message)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound(_) => ChatError::room_not_found(),
                other => other.into(),
            })
    }

    /// Create a room. The creator is always inserted as the first member.
    pub async fn create_room(
        &self,
        name: &str,
        label: &str,
        creator_id: UserId,
        member_ids: &[UserId],
    ) -> ChatResult<RoomSnapshot> {
        let name = Validator::room_name(name)?;
        let label = Validator::label(label)?;

        if self.rooms.find_by_label(&label).await?.is_some() {
            return Err(ChatError::validation("Room with this label already exists."));
        }

        let mut all_members = vec![creator_id];
        all_members.extend(
            dedup_preserving_order(member_ids)
                .into_iter()
                .filter(|id| *id != creator_id),
        );

        if all_members.len() < 2 {
            return Err(ChatError::validation("A room needs at least 2 members."));
        }
        if all_members.len() > self.max_members {
            return Err(self.capacity_error());
        }

        self.ensure_users_exist(&all_members).await?;

        for candidate in &all_members[1..] {
            if !self.friends.are_friends(creator_id, *candidate).await? {
                return Err(not_a_friend(*candidate));
            }
        }

        let room = self
            .rooms
            .create_with_members(&NewRoom {
                name,
                label,
                creator_id,
                member_ids: all_members,
            })
            .await
            .map_err(|e| match e {
                DatabaseError::Duplicate(_) => {
                    ChatError::validation("Room with this label already exists.")
                }
                other => other.into(),
            })?;

        self.snapshot(room.id).await
    }

    /// Add users to a room on behalf of `actor_id`.
    ///
    /// Membership is read once, under the room lock, and every candidate is
    /// judged against that snapshot plus the candidates already accepted in
    /// this call. Nothing is written unless every candidate passes.
    pub async fn add_members(
        &self,
        actor_id: UserId,
        room_id: RoomId,
        user_ids: &[UserId],
    ) -> ChatResult<RoomSnapshot> {
        self.get_room(room_id).await?;
        Validator::user_list(user_ids)?;

        let _guard = self.locks.acquire(room_id).await;

        let current: HashSet<UserId> = self.members.member_ids(room_id).await?.into_iter().collect();
        let candidates = dedup_preserving_order(user_ids);
        self.ensure_users_exist(&candidates).await?;

        let mut accepted = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if current.contains(&candidate) {
                return Err(ChatError::validation(format!(
                    "User {candidate} is already in this room."
                )));
            }
            if candidate != actor_id && !self.friends.are_friends(actor_id, candidate).await? {
                return Err(not_a_friend(candidate));
            }
            if current.len() + accepted.len() + 1 > self.max_members {
                return Err(self.capacity_error());
            }
            accepted.push(candidate);
        }

        self.members.add_members(room_id, &accepted).await?;
        info!(room_id, actor_id, added = accepted.len(), "room members added");

        self.snapshot(room_id).await
    }

    /// Remove users from a room. The creator cannot be removed.
    pub async fn remove_members(
        &self,
        room_id: RoomId,
        user_ids: &[UserId],
    ) -> ChatResult<RoomSnapshot> {
        Validator::user_list(user_ids)?;
        let room = self.get_room(room_id).await?;

        let _guard = self.locks.acquire(room_id).await;

        let current: HashSet<UserId> = self.members.member_ids(room_id).await?.into_iter().collect();
        let targets = dedup_preserving_order(user_ids);

        for target in &targets {
            if !current.contains(target) {
                return Err(ChatError::validation(format!(
                    "User {target} is not in this room."
                )));
            }
            if *target == room.creator_id {
                return Err(ChatError::validation("The room creator cannot be removed."));
            }
        }

        self.members.remove_members(room_id, &targets).await?;
        info!(room_id, removed = targets.len(), "room members removed");

        self.snapshot(room_id).await
    }

    async fn ensure_users_exist(&self, ids: &[UserId]) -> ChatResult<()> {
        let found: HashSet<UserId> = self
            .users
            .find_users(ids.to_vec())
            .await?
            .into_iter()
            .map(|user| user.id)
            .collect();

        match ids.iter().find(|id| !found.contains(id)) {
            Some(missing) => Err(ChatError::not_found(format!("User {missing} does not exist."))),
            None => Ok(()),
        }
    }

    fn capacity_error(&self) -> ChatError {
        ChatError::validation(format!(
            "A room can have at most {} members.",
            self.max_members
        ))
    }
}

fn not_a_friend(user_id: UserId) -> ChatError {
    ChatError::authorization(format!("User {user_id} is not your friend."))
}
