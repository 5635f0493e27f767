//! Room entity definitions

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    pub name: String,
    /// Globally unique slug.
    pub label: String,
    pub creator_id: i64,
    /// Body of the newest message, empty until the first one arrives.
    pub latest_message: String,
    pub created_at: String,
    /// Last activity; drives the "most recently active first" listing.
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
    pub label: String,
    pub creator_id: i64,
    /// Full member list, creator included, in insertion order.
    pub member_ids: Vec<i64>,
}
