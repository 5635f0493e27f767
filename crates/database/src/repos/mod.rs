//! Database repository implementations

pub mod friend_repository;
pub mod member_repository;
pub mod message_repository;
pub mod room_repository;
pub mod user_repository;

pub use friend_repository::*;
pub use member_repository::*;
pub use message_repository::*;
pub use room_repository::*;
pub use user_repository::*;
