//! WebSocket end-to-end tests against a live listener.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use huddle_auth::Authenticator;
use huddle_config::{AppConfig, DatabaseConfig};
use huddle_database::{
    initialize_database, CreateUserRequest, FriendRepository, User, UserRepository,
};
use huddle_gateway::{create_router, GatewayState};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TestServer {
    addr: SocketAddr,
    pool: SqlitePool,
    state: GatewayState,
    authenticator: Authenticator,
    _temp_dir: TempDir,
}

impl TestServer {
    async fn start() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig {
            database: DatabaseConfig {
                url: format!("sqlite://{}", temp_dir.path().join("ws.db").display()),
                max_connections: 4,
            },
            ..AppConfig::default()
        };
        let pool = initialize_database(&config.database).await.unwrap();
        let state = GatewayState::from_pool(pool.clone(), &config);
        let router = create_router(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            addr,
            pool,
            authenticator: state.authenticator.clone(),
            state,
            _temp_dir: temp_dir,
        }
    }

    async fn user(&self, username: &str) -> (User, String) {
        let user = UserRepository::new(self.pool.clone())
            .create(&CreateUserRequest {
                username: username.into(),
                email: format!("{username}@example.com"),
                is_superuser: false,
            })
            .await
            .unwrap();
        let token = self.authenticator.issue_session(user.id).await.unwrap().token;
        (user, token)
    }

    async fn room_of_two(&self) -> ((User, String), (User, String), i64) {
        let alice = self.user("alice").await;
        let bob = self.user("bob").await;
        FriendRepository::new(self.pool.clone())
            .add_friendship(alice.0.id, bob.0.id)
            .await
            .unwrap();
        let room = self
            .state
            .services
            .registry
            .create_room("General", "general", alice.0.id, &[bob.0.id])
            .await
            .unwrap()
            .room
            .id;
        (alice, bob, room)
    }

    async fn connect(&self, room: &str, token: Option<&str>) -> Socket {
        let mut url = format!("ws://{}/ws/chat/{room}", self.addr);
        if let Some(token) = token {
            url.push_str(&format!("?token={token}"));
        }
        let (socket, _) = connect_async(url).await.unwrap();
        socket
    }

    async fn wait_for_subscribers(&self, room: i64, count: usize) {
        for _ in 0..100 {
            if self.state.services.hub.subscriber_count(room).await == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("room {room} never reached {count} subscribers");
    }
}

async fn next_json(socket: &mut Socket) -> Value {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn send_json(socket: &mut Socket, value: Value) {
    socket.send(Message::Text(value.to_string())).await.unwrap();
}

#[tokio::test]
async fn members_exchange_messages() {
    let server = TestServer::start().await;
    let ((alice, alice_token), (_bob, bob_token), room) = server.room_of_two().await;

    let mut a = server.connect(&room.to_string(), Some(&alice_token)).await;
    let mut b = server.connect(&room.to_string(), Some(&bob_token)).await;
    server.wait_for_subscribers(room, 2).await;

    send_json(&mut a, json!({"command": "new_message", "message": "hello"})).await;

    for socket in [&mut a, &mut b] {
        let event = next_json(socket).await;
        assert_eq!(event["command"], "new_message");
        assert_eq!(event["message"]["message"], "hello");
        assert_eq!(event["message"]["user_id"], alice.id);
    }

    send_json(&mut b, json!({"command": "fetch_data"})).await;
    let event = next_json(&mut b).await;
    assert_eq!(event["command"], "fetch_data");
    assert_eq!(event["room"]["id"], room);
    assert_eq!(event["room_users"].as_array().unwrap().len(), 2);
    assert_eq!(event["messages"][0]["message"], "hello");
}

#[tokio::test]
async fn outsider_is_told_and_disconnected() {
    let server = TestServer::start().await;
    let (_alice, _bob, room) = server.room_of_two().await;
    let (_carol, carol_token) = server.user("carol").await;

    let mut c = server.connect(&room.to_string(), Some(&carol_token)).await;

    let event = next_json(&mut c).await;
    assert_eq!(event["command"], "error_message");
    assert_eq!(event["message"], "User is not in this room.");

    let closed = tokio::time::timeout(Duration::from_secs(5), c.next()).await.unwrap();
    assert!(matches!(closed, None | Some(Ok(Message::Close(_))) | Some(Err(_))));
    assert_eq!(server.state.services.hub.subscriber_count(room).await, 0);
}

#[tokio::test]
async fn anonymous_connection_must_log_in() {
    let server = TestServer::start().await;
    let (_alice, _bob, room) = server.room_of_two().await;

    let mut socket = server.connect(&room.to_string(), None).await;

    let event = next_json(&mut socket).await;
    assert_eq!(event["message"], "Require login.");
}

#[tokio::test]
async fn disconnect_unsubscribes() {
    let server = TestServer::start().await;
    let ((_, alice_token), _bob, room) = server.room_of_two().await;

    let mut a = server.connect(&room.to_string(), Some(&alice_token)).await;
    server.wait_for_subscribers(room, 1).await;

    a.close(None).await.unwrap();
    server.wait_for_subscribers(room, 0).await;
}
