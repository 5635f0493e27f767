use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use huddle_config::AuthConfig;
use huddle_database::{DatabaseError, User, UserRepository};
use rand::RngCore;
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tracing::{debug, info};

/// Resolves opaque bearer tokens to the user they were issued for.
///
/// Accounts and credentials live outside this service; the authenticator only
/// mints and checks session tokens for existing users.
#[derive(Clone)]
pub struct Authenticator {
    pool: SqlitePool,
    users: UserRepository,
    session_ttl: Duration,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("repository error: {0}")]
    Repository(#[from] DatabaseError),
    #[error("session not found")]
    SessionNotFound,
    #[error("session expired")]
    SessionExpired,
    #[error("invalid session token")]
    InvalidSession,
    #[error("user {0} not found")]
    UserNotFound(i64),
}

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
}

impl Authenticator {
    pub fn new(pool: SqlitePool, config: &AuthConfig) -> Self {
        let ttl_seconds = i64::try_from(config.session_ttl_seconds).unwrap_or(i64::MAX);
        let session_ttl = Duration::try_seconds(ttl_seconds).unwrap_or(Duration::MAX);

        Self {
            users: UserRepository::new(pool.clone()),
            pool,
            session_ttl,
        }
    }

    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    pub async fn authenticate_token(&self, token: &str) -> Result<(User, AuthSession), AuthError> {
        if token.is_empty() {
            return Err(AuthError::InvalidSession);
        }

        let row = sqlx::query("SELECT user_id, expires_at FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Err(AuthError::SessionNotFound);
        };

        let user_id: i64 = row.try_get("user_id")?;
        let expires_at: String = row.try_get("expires_at")?;

        let expires_at = DateTime::parse_from_rfc3339(&expires_at)
            .map_err(|_| AuthError::InvalidSession)?
            .with_timezone(&Utc);

        if expires_at <= Utc::now() {
            sqlx::query("DELETE FROM sessions WHERE token = ?")
                .bind(token)
                .execute(&self.pool)
                .await?;
            debug!(user_id, "removed expired session");
            return Err(AuthError::SessionExpired);
        }

        let user = self.user_profile(user_id).await?;
        let session = AuthSession {
            token: token.to_owned(),
            user_id,
            expires_at,
        };

        Ok((user, session))
    }

    pub async fn user_profile(&self, user_id: i64) -> Result<User, AuthError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound(user_id))
    }

    /// Mint a new session token for an existing user.
    pub async fn issue_session(&self, user_id: i64) -> Result<AuthSession, AuthError> {
        self.user_profile(user_id).await?;

        let token = generate_session_token();
        let now = Utc::now();
        let expires_at = now.checked_add_signed(self.session_ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);

        sqlx::query(
            "INSERT INTO sessions (user_id, token, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(&token)
        .bind(now.to_rfc3339())
        .bind(expires_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        info!(user_id, "issued session");

        Ok(AuthSession {
            token,
            user_id,
            expires_at,
        })
    }

    /// Drop every session whose expiry has passed. Returns the number removed.
    pub async fn purge_expired_sessions(&self) -> Result<u64, AuthError> {
        let rows = sqlx::query("SELECT token, expires_at FROM sessions")
            .fetch_all(&self.pool)
            .await?;

        let now = Utc::now();
        let mut removed = 0;
        for row in rows {
            let token: String = row.try_get("token")?;
            let expires_at: String = row.try_get("expires_at")?;
            let expired = DateTime::parse_from_rfc3339(&expires_at)
                .map(|at| at.with_timezone(&Utc) <= now)
                .unwrap_or(true);

            if expired {
                removed += sqlx::query("DELETE FROM sessions WHERE token = ?")
                    .bind(&token)
                    .execute(&self.pool)
                    .await?
                    .rows_affected();
            }
        }

        if removed > 0 {
            info!(removed, "purged expired sessions");
        }
        Ok(removed)
    }
}

fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
