//! Outbound realtime events.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{MemberView, MessageView, RoomView};

/// A serialized event, shared between every subscriber it is delivered to.
pub type Frame = Arc<str>;

/// An event pushed to connected clients, tagged by its `command` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ServerEvent {
    FetchData {
        room: RoomView,
        room_users: Vec<MemberView>,
        messages: Vec<MessageView>,
    },
    NewMessage {
        message: MessageView,
    },
    ErrorMessage {
        message: String,
    },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self::ErrorMessage {
            message: message.into(),
        }
    }

    pub fn command_name(&self) -> &'static str {
        match self {
            Self::FetchData { .. } => "fetch_data",
            Self::NewMessage { .. } => "new_message",
            Self::ErrorMessage { .. } => "error_message",
        }
    }

    pub fn to_frame(&self) -> Result<Frame, serde_json::Error> {
        serde_json::to_string(self).map(Frame::from)
    }
}
