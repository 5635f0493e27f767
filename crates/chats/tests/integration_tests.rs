//! End-to-end flows through the public chats API.

use huddle_chats::{ChatError, ChatServices, ChatSession, MembersRequest, ServerEvent, SessionState};
use huddle_config::{ChatConfig, DatabaseConfig};
use huddle_database::{
    initialize_database, CreateUserRequest, FriendRepository, User, UserRepository,
};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tokio::sync::mpsc;

struct TestContext {
    pool: SqlitePool,
    services: ChatServices,
    _temp_dir: TempDir,
}

impl TestContext {
    async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", temp_dir.path().join("it.db").display()),
            max_connections: 4,
        };
        let pool = initialize_database(&config).await.unwrap();
        let services = ChatServices::new(pool.clone(), &ChatConfig::default());

        Self {
            pool,
            services,
            _temp_dir: temp_dir,
        }
    }

    async fn user(&self, username: &str) -> User {
        UserRepository::new(self.pool.clone())
            .create(&CreateUserRequest {
                username: username.into(),
                email: format!("{username}@example.com"),
                is_superuser: false,
            })
            .await
            .unwrap()
    }

    async fn befriend(&self, a: &User, b: &User) {
        FriendRepository::new(self.pool.clone())
            .add_friendship(a.id, b.id)
            .await
            .unwrap();
    }
}

fn drain(rx: &mut mpsc::Receiver<huddle_chats::Frame>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        events.push(serde_json::from_str(&frame).unwrap());
    }
    events
}

#[tokio::test]
async fn message_sent_by_creator_reaches_friend() {
    let ctx = TestContext::new().await;
    let alice = ctx.user("alice").await;
    let bob = ctx.user("bob").await;
    ctx.befriend(&alice, &bob).await;

    let room = ctx
        .services
        .registry
        .create_room("Weekend", "weekend", alice.id, &[bob.id])
        .await
        .unwrap()
        .room
        .id;

    let (mut a, _rx_a) = ChatSession::new(ctx.services.clone(), Some(alice.clone()));
    let (mut b, mut rx_b) = ChatSession::new(ctx.services.clone(), Some(bob));
    assert!(a.open(&room.to_string()).await);
    assert!(b.open(&room.to_string()).await);

    a.handle_text(r#"{"command":"new_message","message":"hello"}"#)
        .await;

    match drain(&mut rx_b).as_slice() {
        [ServerEvent::NewMessage { message }] => {
            assert_eq!(message.message, "hello");
            assert_eq!(message.user_id, alice.id);
            assert_eq!(message.room, room);
        }
        other => panic!("unexpected events {other:?}"),
    }

    let rooms = ctx.services.registry.list_rooms_for_user(alice.id).await.unwrap();
    assert_eq!(rooms[0].latest_message, "hello");
}

#[tokio::test]
async fn outsider_cannot_join_room() {
    let ctx = TestContext::new().await;
    let alice = ctx.user("alice").await;
    let bob = ctx.user("bob").await;
    let carol = ctx.user("carol").await;
    ctx.befriend(&alice, &bob).await;
    let room = ctx
        .services
        .registry
        .create_room("Weekend", "weekend", alice.id, &[bob.id])
        .await
        .unwrap()
        .room
        .id;

    let (mut c, mut rx_c) = ChatSession::new(ctx.services.clone(), Some(carol));
    assert!(!c.open(&room.to_string()).await);

    assert_eq!(c.state(), SessionState::Closed);
    assert_eq!(
        drain(&mut rx_c),
        vec![ServerEvent::error("User is not in this room.")]
    );
    assert_eq!(ctx.services.hub.subscriber_count(room).await, 0);
}

#[tokio::test]
async fn adding_a_stranger_leaves_room_unchanged() {
    let ctx = TestContext::new().await;
    let alice = ctx.user("alice").await;
    let bob = ctx.user("bob").await;
    let dave = ctx.user("dave").await;
    ctx.befriend(&alice, &bob).await;
    let room = ctx
        .services
        .registry
        .create_room("Weekend", "weekend", alice.id, &[bob.id])
        .await
        .unwrap()
        .room
        .id;

    let err = ctx
        .services
        .rooms
        .add_members(Some(&alice), room, MembersRequest { users: vec![dave.id] })
        .await
        .unwrap_err();

    assert!(matches!(err, ChatError::Authorization { .. }));
    assert_eq!(
        ctx.services.registry.member_ids(room).await.unwrap(),
        vec![alice.id, bob.id]
    );
}

#[tokio::test]
async fn room_fills_up_to_ten_members() {
    let ctx = TestContext::new().await;
    let alice = ctx.user("alice").await;
    let mut friends = Vec::new();
    for i in 0..10 {
        let friend = ctx.user(&format!("friend{i}")).await;
        ctx.befriend(&alice, &friend).await;
        friends.push(friend.id);
    }

    let room = ctx
        .services
        .registry
        .create_room("Crowd", "crowd", alice.id, &friends[..2])
        .await
        .unwrap()
        .room
        .id;

    ctx.services
        .rooms
        .add_members(Some(&alice), room, MembersRequest { users: friends[2..9].to_vec() })
        .await
        .unwrap();
    assert_eq!(ctx.services.registry.member_ids(room).await.unwrap().len(), 10);

    let err = ctx
        .services
        .rooms
        .add_members(Some(&alice), room, MembersRequest { users: friends[9..].to_vec() })
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::Validation { .. }));
    assert_eq!(ctx.services.registry.member_ids(room).await.unwrap().len(), 10);
}
