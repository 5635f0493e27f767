//! Repository for the friendship relation.
//!
//! A friendship is an unordered pair. Each pair is stored once with the
//! smaller id in `user_low`, so lookups never have to query both orderings.

use crate::types::{DatabaseError, DatabaseResult};
use sqlx::SqlitePool;
use tracing::info;

fn canonical_pair(a: i64, b: i64) -> (i64, i64) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Repository for friendship database operations
#[derive(Clone)]
pub struct FriendRepository {
    pool: SqlitePool,
}

impl FriendRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// A user is never their own friend.
    pub async fn are_friends(&self, a: i64, b: i64) -> DatabaseResult<bool> {
        if a == b {
            return Ok(false);
        }

        let (low, high) = canonical_pair(a, b);
        let row = sqlx::query("SELECT 1 FROM friendships WHERE user_low = ? AND user_high = ?")
            .bind(low)
            .bind(high)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    pub async fn add_friendship(&self, a: i64, b: i64) -> DatabaseResult<()> {
        if a == b {
            return Err(DatabaseError::ValidationError(
                "a user cannot befriend themselves".to_string(),
            ));
        }

        let (low, high) = canonical_pair(a, b);
        sqlx::query(
            "INSERT OR IGNORE INTO friendships (user_low, user_high, created_at) VALUES (?, ?, ?)",
        )
        .bind(low)
        .bind(high)
        .bind(crate::timestamp_now())
        .execute(&self.pool)
        .await?;

        info!(user_low = low, user_high = high, "recorded friendship");
        Ok(())
    }
}
