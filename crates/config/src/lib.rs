use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// Hard ceiling on room membership, creator included.
pub const DEFAULT_MAX_ROOM_MEMBERS: usize = 10;

/// Number of messages returned by a history fetch.
pub const DEFAULT_MESSAGE_MAXIMUM: usize = 50;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "huddle.toml",
    "config/huddle.toml",
    "crates/config/huddle.toml",
    "../huddle.toml",
    "../config/huddle.toml",
    "../crates/config/huddle.toml",
];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 7070,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://huddle.db".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "AuthConfig::default_session_ttl")]
    pub session_ttl_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_seconds: Self::default_session_ttl(),
        }
    }
}

impl AuthConfig {
    fn default_session_ttl() -> u64 {
        86_400
    }
}

/// Limits applied by the room registry and the realtime layer.
///
/// ```
/// use huddle_config::ChatConfig;
///
/// let chat = ChatConfig::default();
/// assert_eq!(chat.max_room_members, 10);
/// assert_eq!(chat.message_maximum, 50);
/// assert!(chat.subscriber_buffer > 0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "ChatConfig::default_max_room_members")]
    pub max_room_members: usize,
    #[serde(default = "ChatConfig::default_message_maximum")]
    pub message_maximum: usize,
    /// Outbound frames buffered per connection before the connection is dropped.
    #[serde(default = "ChatConfig::default_subscriber_buffer")]
    pub subscriber_buffer: usize,
}

impl ChatConfig {
    const fn default_max_room_members() -> usize {
        DEFAULT_MAX_ROOM_MEMBERS
    }

    const fn default_message_maximum() -> usize {
        DEFAULT_MESSAGE_MAXIMUM
    }

    const fn default_subscriber_buffer() -> usize {
        64
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_room_members: Self::default_max_room_members(),
            message_maximum: Self::default_message_maximum(),
            subscriber_buffer: Self::default_subscriber_buffer(),
        }
    }
}

fn as_i64(value: impl TryInto<i64>) -> i64 {
    value.try_into().unwrap_or(i64::MAX)
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use huddle_config::load;
///
/// std::env::remove_var("HUDDLE_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let mut builder = config::Config::builder()
        .set_default("http.address", defaults.http.address.clone())?
        .set_default("http.port", i64::from(defaults.http.port))?
        .set_default("database.url", defaults.database.url.clone())?
        .set_default(
            "database.max_connections",
            i64::from(defaults.database.max_connections),
        )?
        .set_default(
            "auth.session_ttl_seconds",
            as_i64(defaults.auth.session_ttl_seconds),
        )?
        .set_default("chat.max_room_members", as_i64(defaults.chat.max_room_members))?
        .set_default("chat.message_maximum", as_i64(defaults.chat.message_maximum))?
        .set_default(
            "chat.subscriber_buffer",
            as_i64(defaults.chat.subscriber_buffer),
        )?;

    let environment_overrides = config::Environment::with_prefix("HUDDLE").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("HUDDLE_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via HUDDLE_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    validate(&config)?;

    debug!(?config, "loaded backend configuration");
    Ok(config)
}

fn validate(config: &AppConfig) -> anyhow::Result<()> {
    if config.chat.max_room_members < 2 {
        anyhow::bail!(
            "chat.max_room_members must allow at least 2 members, got {}",
            config.chat.max_room_members
        );
    }
    if config.chat.message_maximum == 0 {
        anyhow::bail!("chat.message_maximum must be greater than zero");
    }
    if config.chat.subscriber_buffer == 0 {
        anyhow::bail!("chat.subscriber_buffer must be greater than zero");
    }
    if config.database.max_connections == 0 {
        anyhow::bail!("database.max_connections must be greater than zero");
    }
    Ok(())
}
