//! Posting and reading room messages.

use std::sync::Arc;

use huddle_database::{CreateMessageRequest, Message, User};
use tracing::{info, warn};

use super::{require_caller, RoomRegistry};
use crate::realtime::BroadcastHub;
use crate::repositories::MessageStore;
use crate::types::{ChatError, ChatResult, MessageView, PostMessageRequest, RoomId, ServerEvent};
use crate::utils::Validator;

/// The single write path for messages, shared by live sessions and HTTP.
///
/// A post is validated, committed to the store, recorded as room activity and
/// published to the room, all while holding the room's ordering turn.
pub struct MessageService {
    registry: Arc<RoomRegistry>,
    store: Arc<dyn MessageStore>,
    hub: Arc<BroadcastHub>,
    message_maximum: usize,
}

impl MessageService {
    pub fn new(
        registry: Arc<RoomRegistry>,
        store: Arc<dyn MessageStore>,
        hub: Arc<BroadcastHub>,
        message_maximum: usize,
    ) -> Self {
        Self {
            registry,
            store,
            hub,
            message_maximum,
        }
    }

    pub fn message_maximum(&self) -> usize {
        self.message_maximum
    }

    pub async fn post(
        &self,
        room_id: RoomId,
        sender: &User,
        body: &str,
        subject: Option<String>,
    ) -> ChatResult<Message> {
        Validator::message_body(body)?;
        let subject = Validator::subject(subject)?;

        if !self.registry.is_member(room_id, sender.id).await? {
            return Err(ChatError::not_in_room());
        }

        let store = &self.store;
        let registry = &self.registry;
        let (message, delivered) = self
            .hub
            .publish_after(room_id, move || async move {
                let message = store
                    .append(CreateMessageRequest {
                        room_id,
                        user_id: sender.id,
                        subject,
                        message: body.to_string(),
                    })
                    .await?;

                if let Err(e) = registry.record_activity(room_id, &message.message).await {
                    warn!(room_id, error = %e, "failed to record room activity");
                }

                let event = ServerEvent::NewMessage {
                    message: MessageView::from(&message),
                };
                Ok::<_, ChatError>((message, event))
            })
            .await?;

        info!(room_id, user_id = sender.id, message_id = message.id, delivered, "message posted");
        Ok(message)
    }

    /// The newest messages of a room, oldest first.
    pub async fn recent(&self, room_id: RoomId) -> ChatResult<Vec<Message>> {
        self.store
            .recent_messages(room_id, self.message_maximum)
            .await
    }

    pub async fn list_messages(
        &self,
        caller: Option<&User>,
        room_id: RoomId,
    ) -> ChatResult<Vec<Message>> {
        let caller = require_caller(caller)?;
        if !self.registry.is_member(room_id, caller.id).await? {
            return Err(ChatError::not_in_room());
        }
        self.recent(room_id).await
    }

    pub async fn create_message(
        &self,
        caller: Option<&User>,
        request: PostMessageRequest,
    ) -> ChatResult<Message> {
        let caller = require_caller(caller)?;
        self.registry.get_room(request.room).await?;
        self.post(request.room, caller, &request.message, request.subject)
            .await
    }
}
