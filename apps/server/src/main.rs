use anyhow::Context;
use clap::{Parser, Subcommand};
use huddle_config::load as load_config;
use huddle_database::{CreateUserRequest, FriendRepository, User, UserRepository};
use huddle_gateway::{create_router, GatewayState};
use huddle_runtime::{telemetry, BackendServices};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "huddle")]
#[command(about = "Huddle chat backend (serves by default)")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Start the HTTP and WebSocket server
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
    /// Create demo users, friendships and a room, and print session tokens
    SeedData,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing().context("failed to initialise tracing")?;

    let config = load_config().context("failed to load configuration")?;
    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server(&config, services).await,
        Commands::Migrate => {
            // Migrations already ran during initialisation.
            info!(url = %config.database.url, "database is up to date");
            Ok(())
        }
        Commands::SeedData => seed_data(&services).await,
    }
}

async fn run_server(
    config: &huddle_config::AppConfig,
    services: BackendServices,
) -> anyhow::Result<()> {
    info!("starting Huddle backend");

    let state = GatewayState::new(services.chat.clone(), services.authenticator.clone());
    let app = create_router(state);

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(huddle_runtime::shutdown_signal())
        .await
        .context("http server error")?;

    info!("backend shut down");
    Ok(())
}

/// Demo accounts: `admin` is a superuser, everyone is friends with `alice`,
/// and `bob` is also friends with `carol`.
const SEED_USERS: [(&str, bool); 4] = [
    ("admin", true),
    ("alice", false),
    ("bob", false),
    ("carol", false),
];
const SEED_FRIENDSHIPS: [(&str, &str); 4] = [
    ("alice", "admin"),
    ("alice", "bob"),
    ("alice", "carol"),
    ("bob", "carol"),
];

async fn seed_user(
    users: &UserRepository,
    username: &str,
    is_superuser: bool,
) -> anyhow::Result<User> {
    if let Some(user) = users.find_by_username(username).await? {
        return Ok(user);
    }

    users
        .create(&CreateUserRequest {
            username: username.to_string(),
            email: format!("{username}@huddle.local"),
            is_superuser,
        })
        .await
        .with_context(|| format!("failed to create user {username}"))
}

async fn seed_data(services: &BackendServices) -> anyhow::Result<()> {
    info!("seeding database with demo data");

    let users = UserRepository::new(services.db_pool.clone());
    let friends = FriendRepository::new(services.db_pool.clone());

    let mut seeded = Vec::with_capacity(SEED_USERS.len());
    for (username, is_superuser) in SEED_USERS {
        seeded.push(seed_user(&users, username, is_superuser).await?);
    }
    let id_of = |name: &str| {
        seeded
            .iter()
            .find(|user| user.username == name)
            .map(|user| user.id)
            .with_context(|| format!("seed user {name} missing"))
    };

    for (a, b) in SEED_FRIENDSHIPS {
        friends
            .add_friendship(id_of(a)?, id_of(b)?)
            .await
            .with_context(|| format!("failed to befriend {a} and {b}"))?;
    }

    let alice = id_of("alice")?;
    let room = match services
        .chat
        .registry
        .create_room("Lobby", "lobby", alice, &[id_of("bob")?, id_of("carol")?])
        .await
    {
        Ok(snapshot) => Some(snapshot.room.id),
        Err(err) => {
            info!(error = %err, "demo room not created");
            None
        }
    };

    println!("Database seeded with demo data:");
    if let Some(room) = room {
        println!("- room 'lobby' (id {room}) with alice, bob and carol");
    }
    println!("Session tokens:");
    for user in &seeded {
        let session = services
            .authenticator
            .issue_session(user.id)
            .await
            .with_context(|| format!("failed to issue a session for {}", user.username))?;
        println!("  {:<8} {}", user.username, session.token);
    }

    Ok(())
}
