//! Domain entities for the database layer

pub mod message;
pub mod room;
pub mod user;

pub use message::{CreateMessageRequest, Message};
pub use room::{CreateRoomRequest, Room};
pub use user::{CreateUserRequest, User};
