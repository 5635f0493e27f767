//! Business logic layer.

pub mod message_service;
pub mod registry;
pub mod room_service;

use std::sync::Arc;

use huddle_config::ChatConfig;
use huddle_database::{MessageRepository, User};
use sqlx::SqlitePool;

use crate::realtime::BroadcastHub;
use crate::types::{ChatError, ChatResult};

pub use message_service::MessageService;
pub use registry::RoomRegistry;
pub use room_service::RoomService;

/// Everything a connection or request handler needs, wired once at startup.
#[derive(Clone)]
pub struct ChatServices {
    pub registry: Arc<RoomRegistry>,
    pub hub: Arc<BroadcastHub>,
    pub rooms: Arc<RoomService>,
    pub messages: Arc<MessageService>,
    pub config: ChatConfig,
}

impl ChatServices {
    pub fn new(pool: SqlitePool, config: &ChatConfig) -> Self {
        let registry = Arc::new(RoomRegistry::new(pool.clone(), config));
        let hub = Arc::new(BroadcastHub::new());
        let messages = Arc::new(MessageService::new(
            registry.clone(),
            Arc::new(MessageRepository::new(pool)),
            hub.clone(),
            config.message_maximum,
        ));

        Self {
            rooms: Arc::new(RoomService::new(registry.clone())),
            registry,
            hub,
            messages,
            config: config.clone(),
        }
    }
}

pub(crate) fn require_caller(caller: Option<&User>) -> ChatResult<&User> {
    caller.ok_or_else(|| {
        ChatError::permission_denied("Authentication credentials were not provided.")
    })
}
