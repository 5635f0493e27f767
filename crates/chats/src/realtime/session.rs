//! Per-connection state machine: one user, one room.
//!
//! ```text
//! Connecting --bind ok--> Bound --subscribe--> Active --close--> Closed
//!      |                    |
//!      +-----rejected-------+--------------------------------->  Closed
//! ```

use huddle_database::User;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::hub::{DeliveryError, SessionHandle, SessionId};
use crate::services::ChatServices;
use crate::types::errors::{INVALID_ROOM_ID, MALFORMED_COMMAND, REQUIRE_LOGIN};
use crate::types::{
    ChatError, ChatResult, ClientCommand, CommandError, Frame, MemberView, MessageView, RoomId,
    RoomView, ServerEvent,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Bound,
    Active,
    Closed,
}

pub struct ChatSession {
    services: ChatServices,
    handle: SessionHandle,
    user: Option<User>,
    room_id: Option<RoomId>,
    state: SessionState,
}

impl ChatSession {
    /// Start a session for an (optionally) authenticated user. The receiver
    /// yields every frame destined for this connection.
    pub fn new(services: ChatServices, user: Option<User>) -> (Self, mpsc::Receiver<Frame>) {
        let user_id = user.as_ref().map_or(0, |user| user.id);
        let (handle, outbound) = SessionHandle::new(user_id, services.config.subscriber_buffer);

        let session = Self {
            services,
            handle,
            user,
            room_id: None,
            state: SessionState::Connecting,
        };
        (session, outbound)
    }

    pub fn id(&self) -> SessionId {
        self.handle.session_id()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn room_id(&self) -> Option<RoomId> {
        self.room_id
    }

    pub fn session_handle(&self) -> &SessionHandle {
        &self.handle
    }

    /// Run the handshake against `target`, the room id taken from the
    /// connection path. Returns `true` once the session is active.
    ///
    /// Rejections always reach this connection. When the target names a room
    /// that exists, the room's subscribers see the error too. The session is
    /// left closed either way.
    pub async fn open(&mut self, target: &str) -> bool {
        if self.state != SessionState::Connecting {
            return self.state == SessionState::Active;
        }

        match self.bind(target).await {
            Ok(room_id) => {
                self.room_id = Some(room_id);
                self.state = SessionState::Bound;
                self.activate().await;
                true
            }
            Err((err, room_id)) => {
                debug!(session_id = %self.id(), target, error = %err, "handshake rejected");
                let event = ServerEvent::error(err.user_message());
                self.send_direct(&event).await;
                if let Some(room_id) = room_id {
                    self.services.hub.publish(room_id, &event).await;
                }
                self.state = SessionState::Closed;
                false
            }
        }
    }

    /// On failure, also yields the room id when it names an existing room.
    async fn bind(&self, target: &str) -> Result<RoomId, (ChatError, Option<RoomId>)> {
        let user = self
            .user
            .as_ref()
            .ok_or_else(|| (ChatError::permission_denied(REQUIRE_LOGIN), None))?;

        let room_id = target
            .trim()
            .trim_matches('/')
            .parse::<RoomId>()
            .map_err(|_| (ChatError::validation(INVALID_ROOM_ID), None))?;

        match self.services.registry.is_member(room_id, user.id).await {
            Ok(true) => Ok(room_id),
            Ok(false) => Err((ChatError::not_in_room(), Some(room_id))),
            Err(err) => Err((err, None)),
        }
    }

    async fn activate(&mut self) {
        let Some(room_id) = self.room_id else {
            return;
        };

        self.services.hub.subscribe(room_id, self.handle.clone()).await;
        self.state = SessionState::Active;
        info!(session_id = %self.id(), room_id, user_id = self.handle.user_id(), "session active");
    }

    /// Decode and dispatch one inbound text frame.
    pub async fn handle_text(&mut self, text: &str) {
        if self.state != SessionState::Active {
            debug!(session_id = %self.id(), state = ?self.state, "ignoring frame outside active state");
            return;
        }

        match ClientCommand::decode(text) {
            Ok(command) => self.handle(command).await,
            Err(err @ CommandError::Unknown(_)) => {
                self.report_error(err.to_string()).await;
            }
            Err(CommandError::Malformed(reason)) => {
                debug!(session_id = %self.id(), reason, "malformed command");
                self.report_error(MALFORMED_COMMAND).await;
            }
        }
    }

    pub async fn handle(&mut self, command: ClientCommand) {
        let (Some(room_id), Some(user)) = (self.room_id, self.user.clone()) else {
            return;
        };
        if self.state != SessionState::Active {
            return;
        }

        match command {
            ClientCommand::FetchData => match self.fetch_data(room_id, &user).await {
                Ok(event) => self.send_direct(&event).await,
                Err(err) => self.report_error(err.user_message()).await,
            },
            ClientCommand::NewMessage { message, subject } => {
                if let Err(err) = self
                    .services
                    .messages
                    .post(room_id, &user, &message, subject)
                    .await
                {
                    self.report_error(err.user_message()).await;
                }
            }
        }
    }

    async fn fetch_data(&self, room_id: RoomId, user: &User) -> ChatResult<ServerEvent> {
        let snapshot = self.services.registry.snapshot(room_id).await?;
        if !snapshot.members.iter().any(|member| member.id == user.id) {
            return Err(ChatError::not_in_room());
        }
        let messages = self.services.messages.recent(room_id).await?;

        Ok(ServerEvent::FetchData {
            room: RoomView::from(&snapshot.room),
            room_users: snapshot.members.iter().map(MemberView::from).collect(),
            messages: messages.iter().map(MessageView::from).collect(),
        })
    }

    /// Errors raised while active go to the whole room, not just this session.
    async fn report_error(&self, message: impl Into<String>) {
        if let Some(room_id) = self.room_id {
            self.services
                .hub
                .publish(room_id, &ServerEvent::error(message))
                .await;
        }
    }

    /// Queue an event for this connection only. A full queue gets the same
    /// treatment the hub gives slow subscribers: the session leaves its room
    /// and the transport is told to disconnect.
    async fn send_direct(&self, event: &ServerEvent) {
        let frame = match event.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(session_id = %self.id(), error = %e, "failed to serialize event");
                return;
            }
        };
        match self.handle.try_deliver(frame) {
            Ok(()) => {}
            Err(DeliveryError::Full) => {
                warn!(session_id = %self.id(), command = event.command_name(), "outbound queue full, evicting session");
                if let Some(room_id) = self.room_id {
                    self.services.hub.unsubscribe(room_id, self.id()).await;
                }
                self.handle.evict();
            }
            Err(DeliveryError::Closed) => {
                debug!(session_id = %self.id(), command = event.command_name(), "dropped direct frame");
            }
        }
    }

    /// Leave the room. Safe to call any number of times.
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }

        if let Some(room_id) = self.room_id {
            if self.state == SessionState::Active {
                self.services.hub.unsubscribe(room_id, self.id()).await;
            }
        }

        self.state = SessionState::Closed;
        info!(session_id = %self.id(), room_id = ?self.room_id, "session closed");
    }
}
