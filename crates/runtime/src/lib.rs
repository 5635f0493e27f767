use anyhow::{Context, Result};
use huddle_auth::Authenticator;
use huddle_chats::ChatServices;
use huddle_config::AppConfig;
use huddle_database::{prepare_database, run_migrations};
use sqlx::SqlitePool;
use tracing::info;

pub mod telemetry {
    use anyhow::Result;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    /// Install the global subscriber. `RUST_LOG` overrides the `info` default.
    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_env_filter(env_filter)
            .with_target(true)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

#[derive(Clone)]
pub struct BackendServices {
    pub db_pool: SqlitePool,
    pub authenticator: Authenticator,
    pub chat: ChatServices,
}

impl BackendServices {
    /// Open the database, bring the schema up to date and wire the services.
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let db_pool = prepare_database(&config.database)
            .await
            .context("failed to connect to database")?;
        run_migrations(&db_pool).await?;

        let authenticator = Authenticator::new(db_pool.clone(), &config.auth);
        let purged = authenticator
            .purge_expired_sessions()
            .await
            .context("failed to purge expired sessions")?;
        let chat = ChatServices::new(db_pool.clone(), &config.chat);

        info!(
            max_room_members = config.chat.max_room_members,
            message_maximum = config.chat.message_maximum,
            purged_sessions = purged,
            "chat services ready"
        );

        Ok(Self {
            db_pool,
            authenticator,
            chat,
        })
    }
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
