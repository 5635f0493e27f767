//! # Huddle Chats Crate
//!
//! Core of the real-time chat: rooms with capped, friendship-gated
//! membership, an ordered per-room broadcast hub, and the connection session
//! that ties one socket to one room.
//!
//! ## Architecture
//!
//! - **Services**: room registry, room and message operations
//! - **Realtime**: broadcast hub and the connection session state machine
//! - **Repositories**: the collaborator traits the services depend on
//! - **Types**: wire commands, events, request and response shapes, errors
//! - **Utils**: input validation
//!
//! ## Usage
//!
//! ```rust,no_run
//! # async fn demo(pool: sqlx::SqlitePool, user: huddle_database::User) {
//! use huddle_chats::{ChatServices, ChatSession};
//!
//! let services = ChatServices::new(pool, &huddle_config::ChatConfig::default());
//! let (mut session, mut outbound) = ChatSession::new(services, Some(user));
//! if session.open("1").await {
//!     session.handle_text(r#"{"command":"fetch_data"}"#).await;
//! }
//! # let _ = outbound.recv().await;
//! # }
//! ```

pub mod realtime;
pub mod repositories;
pub mod services;
pub mod types;
pub mod utils;

pub use realtime::{BroadcastHub, ChatSession, SessionHandle, SessionId, SessionState};
pub use repositories::{FriendshipOracle, MessageStore, UserDirectory};
pub use services::{ChatServices, MessageService, RoomRegistry, RoomService};
pub use types::{
    ChatError, ChatResult, ClientCommand, CommandError, CreateRoomRequest, Frame, MemberView,
    MembersRequest, MessageView, PostMessageRequest, RoomDetails, RoomId, RoomSnapshot, RoomView,
    ServerEvent, UserId,
};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use huddle_config::{ChatConfig, DatabaseConfig};
    use huddle_database::{
        initialize_database, CreateUserRequest, FriendRepository, User, UserRepository,
    };
    use sqlx::SqlitePool;
    use tempfile::TempDir;

    use crate::services::{ChatServices, RoomRegistry};
    use crate::types::RoomId;

    pub struct TestContext {
        pub pool: SqlitePool,
        pub registry: Arc<RoomRegistry>,
        pub services: ChatServices,
        _temp_dir: TempDir,
    }

    impl TestContext {
        pub async fn new() -> Self {
            Self::with_config(ChatConfig::default()).await
        }

        pub async fn with_message_maximum(message_maximum: usize) -> Self {
            Self::with_config(ChatConfig {
                message_maximum,
                ..ChatConfig::default()
            })
            .await
        }

        pub async fn with_subscriber_buffer(subscriber_buffer: usize) -> Self {
            Self::with_config(ChatConfig {
                subscriber_buffer,
                ..ChatConfig::default()
            })
            .await
        }

        async fn with_config(config: ChatConfig) -> Self {
            let temp_dir = TempDir::new().unwrap();
            let db_path = temp_dir.path().join("chats.db");
            let pool = initialize_database(&DatabaseConfig {
                url: format!("sqlite://{}", db_path.display()),
                max_connections: 4,
            })
            .await
            .unwrap();

            let services = ChatServices::new(pool.clone(), &config);
            Self {
                pool,
                registry: services.registry.clone(),
                services,
                _temp_dir: temp_dir,
            }
        }

        async fn create_user(&self, username: &str, is_superuser: bool) -> User {
            UserRepository::new(self.pool.clone())
                .create(&CreateUserRequest {
                    username: username.to_string(),
                    email: format!("{username}@example.com"),
                    is_superuser,
                })
                .await
                .unwrap()
        }

        pub async fn user(&self, username: &str) -> User {
            self.create_user(username, false).await
        }

        pub async fn superuser(&self, username: &str) -> User {
            self.create_user(username, true).await
        }

        pub async fn befriend(&self, a: &User, b: &User) {
            FriendRepository::new(self.pool.clone())
                .add_friendship(a.id, b.id)
                .await
                .unwrap();
        }

        /// `alice` creates room `general` with her friend `bob`.
        pub async fn room_of_two(&self) -> (User, User, RoomId) {
            let alice = self.user("alice").await;
            let bob = self.user("bob").await;
            self.befriend(&alice, &bob).await;

            let snapshot = self
                .registry
                .create_room("General", "general", alice.id, &[bob.id])
                .await
                .unwrap();
            (alice, bob, snapshot.room.id)
        }
    }
}
