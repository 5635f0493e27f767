//! Error types for the chat system.

use huddle_database::DatabaseError;
use thiserror::Error;

pub const REQUIRE_LOGIN: &str = "Require login.";
pub const NOT_IN_ROOM: &str = "User is not in this room.";
pub const ROOM_NOT_FOUND: &str = "Room does not exist.";
pub const INVALID_ROOM_ID: &str = "Invalid room id.";
pub const EMPTY_MESSAGE: &str = "Message content is require.";
pub const MALFORMED_COMMAND: &str = "Malformed command.";

/// Result type alias for chat operations
pub type ChatResult<T> = Result<T, ChatError>;

/// Main error type for the chat system
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Malformed input or a business rule violation.
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// The acting user may not do this to these users: non-friend adds, non-member posts.
    #[error("Authorization error: {reason}")]
    Authorization { reason: String },

    /// The caller lacks the standing to attempt the operation at all.
    #[error("Permission denied: {reason}")]
    PermissionDenied { reason: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl ChatError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn authorization(reason: impl Into<String>) -> Self {
        Self::Authorization {
            reason: reason.into(),
        }
    }

    pub fn permission_denied(reason: impl Into<String>) -> Self {
        Self::PermissionDenied {
            reason: reason.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn room_not_found() -> Self {
        Self::not_found(ROOM_NOT_FOUND)
    }

    pub fn not_in_room() -> Self {
        Self::authorization(NOT_IN_ROOM)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Text safe to show to an end user. Storage details are not leaked.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { message } | Self::NotFound { message } => message.clone(),
            Self::Authorization { reason } | Self::PermissionDenied { reason } => reason.clone(),
            Self::Database(_) | Self::Internal { .. } => "Internal server error.".to_string(),
        }
    }
}
