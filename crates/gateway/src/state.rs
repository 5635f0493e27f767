//! Shared application state for the gateway

use huddle_auth::Authenticator;
use huddle_chats::ChatServices;
use huddle_config::AppConfig;
use sqlx::SqlitePool;

/// Everything a request handler or socket task needs.
#[derive(Clone)]
pub struct GatewayState {
    /// Rooms, messages and the live broadcast hub
    pub services: ChatServices,
    /// Resolves bearer tokens to users
    pub authenticator: Authenticator,
}

impl GatewayState {
    pub fn new(services: ChatServices, authenticator: Authenticator) -> Self {
        Self {
            services,
            authenticator,
        }
    }

    /// Wire all services over an already migrated pool.
    pub fn from_pool(pool: SqlitePool, config: &AppConfig) -> Self {
        Self::new(
            ChatServices::new(pool.clone(), &config.chat),
            Authenticator::new(pool, &config.auth),
        )
    }
}
