//! Repository for user data access operations.

use crate::entities::{CreateUserRequest, User};
use crate::types::{DatabaseError, DatabaseResult};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

const USER_COLUMNS: &str = "id, username, email, is_superuser, is_online, created_at";

pub(crate) fn user_from_row(row: &SqliteRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        is_superuser: row.try_get("is_superuser")?,
        is_online: row.try_get("is_online")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Repository for user database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    pub async fn find_by_username(&self, username: &str) -> DatabaseResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    /// Fetch every user whose id appears in `ids`. Unknown ids are skipped.
    pub async fn find_by_ids(&self, ids: &[i64]) -> DatabaseResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id IN ({placeholders}) ORDER BY id");

        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(*id);
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows
            .iter()
            .map(user_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    pub async fn list(&self) -> DatabaseResult<Vec<User>> {
        let rows = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(user_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    pub async fn create(&self, request: &CreateUserRequest) -> DatabaseResult<User> {
        let username = request.username.trim();
        if username.is_empty() {
            return Err(DatabaseError::ValidationError(
                "username must not be empty".to_string(),
            ));
        }

        let now = crate::timestamp_now();
        let result = sqlx::query(
            "INSERT INTO users (username, email, is_superuser, is_online, created_at)
             VALUES (?, ?, ?, 0, ?)",
        )
        .bind(username)
        .bind(&request.email)
        .bind(request.is_superuser)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let user_id = result.last_insert_rowid();
        info!(user_id, username, "created user");

        Ok(User {
            id: user_id,
            username: username.to_string(),
            email: request.email.clone(),
            is_superuser: request.is_superuser,
            is_online: false,
            created_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{create_test_database, create_user};

    #[tokio::test]
    async fn test_create_and_find_user() {
        let (pool, _dir) = create_test_database().await;
        let repo = UserRepository::new(pool.clone());

        let alice = create_user(&pool, "alice").await;
        let found = repo.find_by_id(alice.id).await.unwrap().unwrap();

        assert_eq!(found, alice);
        assert_eq!(
            repo.find_by_username("alice").await.unwrap().map(|u| u.id),
            Some(alice.id)
        );
        assert!(repo.find_by_id(alice.id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_is_rejected() {
        let (pool, _dir) = create_test_database().await;
        create_user(&pool, "alice").await;

        let err = UserRepository::new(pool)
            .create(&CreateUserRequest {
                username: "alice".to_string(),
                email: String::new(),
                is_superuser: false,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DatabaseError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_find_by_ids_skips_unknown() {
        let (pool, _dir) = create_test_database().await;
        let alice = create_user(&pool, "alice").await;
        let bob = create_user(&pool, "bob").await;

        let users = UserRepository::new(pool)
            .find_by_ids(&[bob.id, 999, alice.id])
            .await
            .unwrap();

        let ids: Vec<_> = users.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![alice.id, bob.id]);
    }
}
