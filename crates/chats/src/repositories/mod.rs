//! Collaborator interfaces consumed by the chat core.
//!
//! Each trait has a SQLite-backed implementation on the matching
//! `huddle-database` repository.

use async_trait::async_trait;
use huddle_database::{
    CreateMessageRequest, FriendRepository, Message, MessageRepository, User, UserRepository,
};

use crate::types::{ChatResult, RoomId, UserId};

/// Answers whether two users are friends. The relation is symmetric.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FriendshipOracle: Send + Sync {
    async fn are_friends(&self, a: UserId, b: UserId) -> ChatResult<bool>;
}

/// Durable message history.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn append(&self, request: CreateMessageRequest) -> ChatResult<Message>;

    /// Up to `limit` of the newest messages, oldest first.
    async fn recent_messages(&self, room_id: RoomId, limit: usize) -> ChatResult<Vec<Message>>;
}

/// Read access to accounts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_users(&self, ids: Vec<UserId>) -> ChatResult<Vec<User>>;
}

#[async_trait]
impl FriendshipOracle for FriendRepository {
    async fn are_friends(&self, a: UserId, b: UserId) -> ChatResult<bool> {
        Ok(FriendRepository::are_friends(self, a, b).await?)
    }
}

#[async_trait]
impl MessageStore for MessageRepository {
    async fn append(&self, request: CreateMessageRequest) -> ChatResult<Message> {
        Ok(self.create(&request).await?)
    }

    async fn recent_messages(&self, room_id: RoomId, limit: usize) -> ChatResult<Vec<Message>> {
        Ok(self.recent_for_room(room_id, limit).await?)
    }
}

#[async_trait]
impl UserDirectory for UserRepository {
    async fn find_users(&self, ids: Vec<UserId>) -> ChatResult<Vec<User>> {
        Ok(self.find_by_ids(&ids).await?)
    }
}
