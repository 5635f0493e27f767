//! Huddle Database Crate
//!
//! Connection management, migrations, entities and the repositories that back
//! rooms, memberships, messages and friendships.

use huddle_config::DatabaseConfig;
use sqlx::SqlitePool;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod types;

pub use connection::prepare_database;
pub use migrations::run_migrations;

pub use repos::{
    FriendRepository, MemberRepository, MessageRepository, RoomRepository, UserRepository,
};

pub use entities::{
    message::{CreateMessageRequest, Message},
    room::{CreateRoomRequest, Room},
    user::{CreateUserRequest, User},
};

pub use types::{errors::DatabaseError, DatabaseResult};

pub use sqlx::Pool;

/// Current time as an RFC 3339 UTC string with fixed microsecond precision.
///
/// The fixed width keeps lexical order equal to chronological order, which the
/// `ORDER BY updated_at` queries rely on.
pub fn timestamp_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

/// Initialize the database with migrations
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::ConnectionError(format!("{e:#}")))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(format!("{e:#}")))?;

    Ok(pool)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use tempfile::TempDir;

    pub async fn create_test_database() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let config = DatabaseConfig {
            url: format!("sqlite://{}", db_path.display()),
            max_connections: 2,
        };

        let pool = initialize_database(&config).await.unwrap();
        (pool, temp_dir)
    }

    pub async fn create_user(pool: &SqlitePool, username: &str) -> User {
        UserRepository::new(pool.clone())
            .create(&CreateUserRequest {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                is_superuser: false,
            })
            .await
            .unwrap()
    }
}
