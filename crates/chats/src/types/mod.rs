//! Shared types for the chat core.

pub mod commands;
pub mod errors;
pub mod events;
pub mod requests;
pub mod responses;

pub use commands::{ClientCommand, CommandError};
pub use errors::{ChatError, ChatResult};
pub use events::{Frame, ServerEvent};
pub use requests::{CreateRoomRequest, MembersRequest, PostMessageRequest};
pub use responses::{MemberView, MessageView, RoomDetails, RoomSnapshot, RoomView};

pub type RoomId = i64;
pub type UserId = i64;
