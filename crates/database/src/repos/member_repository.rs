//! Repository for room membership.

use crate::entities::User;
use crate::repos::user_repository::user_from_row;
use crate::types::DatabaseResult;
use sqlx::{Row, SqlitePool};
use tracing::info;

/// Repository for member database operations
#[derive(Clone)]
pub struct MemberRepository {
    pool: SqlitePool,
}

impl MemberRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Member ids in join order.
    pub async fn member_ids(&self, room_id: i64) -> DatabaseResult<Vec<i64>> {
        let rows = sqlx::query("SELECT user_id FROM room_members WHERE room_id = ? ORDER BY rowid")
            .bind(room_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| row.try_get::<i64, _>("user_id"))
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// Member accounts in join order.
    pub async fn members(&self, room_id: i64) -> DatabaseResult<Vec<User>> {
        let rows = sqlx::query(
            "SELECT u.id, u.username, u.email, u.is_superuser, u.is_online, u.created_at
             FROM room_members m
             INNER JOIN users u ON u.id = m.user_id
             WHERE m.room_id = ?
             ORDER BY m.rowid",
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(user_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    pub async fn is_member(&self, room_id: i64, user_id: i64) -> DatabaseResult<bool> {
        let row = sqlx::query("SELECT 1 FROM room_members WHERE room_id = ? AND user_id = ?")
            .bind(room_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Insert all memberships or none.
    pub async fn add_members(&self, room_id: i64, user_ids: &[i64]) -> DatabaseResult<()> {
        let now = crate::timestamp_now();
        let mut tx = self.pool.begin().await?;

        for user_id in user_ids {
            sqlx::query("INSERT INTO room_members (room_id, user_id, joined_at) VALUES (?, ?, ?)")
                .bind(room_id)
                .bind(*user_id)
                .bind(&now)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        info!(room_id, added = ?user_ids, "added members to room");
        Ok(())
    }

    /// Delete all memberships or none.
    pub async fn remove_members(&self, room_id: i64, user_ids: &[i64]) -> DatabaseResult<()> {
        let mut tx = self.pool.begin().await?;

        for user_id in user_ids {
            sqlx::query("DELETE FROM room_members WHERE room_id = ? AND user_id = ?")
                .bind(room_id)
                .bind(*user_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        info!(room_id, removed = ?user_ids, "removed members from room");
        Ok(())
    }
}
