//! Repository for room data access operations.

use crate::entities::{CreateRoomRequest, Room};
use crate::types::{DatabaseError, DatabaseResult};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

const ROOM_COLUMNS: &str =
    "r.id, r.name, r.label, r.creator_id, r.latest_message, r.created_at, r.updated_at";

fn room_from_row(row: &SqliteRow) -> Result<Room, sqlx::Error> {
    Ok(Room {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        label: row.try_get("label")?,
        creator_id: row.try_get("creator_id")?,
        latest_message: row.try_get("latest_message")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Repository for room database operations
#[derive(Clone)]
pub struct RoomRepository {
    pool: SqlitePool,
}

impl RoomRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<Room>> {
        let row = sqlx::query(&format!("SELECT {ROOM_COLUMNS} FROM rooms r WHERE r.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(room_from_row).transpose()?)
    }

    pub async fn find_by_label(&self, label: &str) -> DatabaseResult<Option<Room>> {
        let row = sqlx::query(&format!("SELECT {ROOM_COLUMNS} FROM rooms r WHERE r.label = ?"))
            .bind(label)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(room_from_row).transpose()?)
    }

    /// Insert the room and its initial members in one transaction.
    pub async fn create_with_members(&self, request: &CreateRoomRequest) -> DatabaseResult<Room> {
        let now = crate::timestamp_now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO rooms (name, label, creator_id, latest_message, created_at, updated_at)
             VALUES (?, ?, ?, '', ?, ?)",
        )
        .bind(&request.name)
        .bind(&request.label)
        .bind(request.creator_id)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DatabaseError::from(e) {
            DatabaseError::Duplicate(_) => {
                DatabaseError::Duplicate(format!("room label '{}' is taken", request.label))
            }
            other => other,
        })?;

        let room_id = result.last_insert_rowid();

        for user_id in &request.member_ids {
            sqlx::query("INSERT INTO room_members (room_id, user_id, joined_at) VALUES (?, ?, ?)")
                .bind(room_id)
                .bind(*user_id)
                .bind(&now)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        info!(
            room_id,
            creator_id = request.creator_id,
            members = request.member_ids.len(),
            "created room"
        );

        Ok(Room {
            id: room_id,
            name: request.name.clone(),
            label: request.label.clone(),
            creator_id: request.creator_id,
            latest_message: String::new(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Rooms the user belongs to, most recently active first.
    pub async fn list_for_user(&self, user_id: i64) -> DatabaseResult<Vec<Room>> {
        let rows = sqlx::query(&format!(
            "SELECT {ROOM_COLUMNS}
             FROM rooms r
             INNER JOIN room_members m ON m.room_id = r.id
             WHERE m.user_id = ?
             ORDER BY r.updated_at DESC, r.id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(room_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// Store the newest message preview and bump the activity timestamp.
    pub async fn record_activity(&self, room_id: i64, latest_message: &str) -> DatabaseResult<()> {
        let result =
            sqlx::query("UPDATE rooms SET latest_message = ?, updated_at = ? WHERE id = ?")
                .bind(latest_message)
                .bind(crate::timestamp_now())
                .bind(room_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("room {room_id}")));
        }
        Ok(())
    }
}
