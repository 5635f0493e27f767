//! Repository for message data access operations.

use crate::entities::{CreateMessageRequest, Message};
use crate::types::{DatabaseError, DatabaseResult};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

const MESSAGE_SELECT: &str = "SELECT m.id, m.room_id, m.user_id, u.username, m.subject, m.message, m.created_at
     FROM messages m
     INNER JOIN users u ON u.id = m.user_id";

fn message_from_row(row: &SqliteRow) -> Result<Message, sqlx::Error> {
    Ok(Message {
        id: row.try_get("id")?,
        room_id: row.try_get("room_id")?,
        user_id: row.try_get("user_id")?,
        username: row.try_get("username")?,
        subject: row.try_get("subject")?,
        message: row.try_get("message")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Repository for message database operations
#[derive(Clone)]
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<Message>> {
        let row = sqlx::query(&format!("{MESSAGE_SELECT} WHERE m.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(message_from_row).transpose()?)
    }

    pub async fn create(&self, request: &CreateMessageRequest) -> DatabaseResult<Message> {
        let result = sqlx::query(
            "INSERT INTO messages (room_id, user_id, subject, message, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(request.room_id)
        .bind(request.user_id)
        .bind(request.subject.as_deref())
        .bind(&request.message)
        .bind(crate::timestamp_now())
        .execute(&self.pool)
        .await?;

        let message_id = result.last_insert_rowid();
        debug!(message_id, room_id = request.room_id, user_id = request.user_id, "stored message");

        self.find_by_id(message_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("message {message_id}")))
    }

    /// The newest `limit` messages of a room, returned oldest first.
    pub async fn recent_for_room(&self, room_id: i64, limit: usize) -> DatabaseResult<Vec<Message>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(&format!(
            "{MESSAGE_SELECT} WHERE m.room_id = ? ORDER BY m.id DESC LIMIT ?"
        ))
        .bind(room_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut messages = rows
            .iter()
            .map(message_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        messages.reverse();
        Ok(messages)
    }
}
