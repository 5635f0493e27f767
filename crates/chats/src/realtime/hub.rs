//! Per-room fan-out of server events to connected sessions.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex, Notify, OwnedMutexGuard, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::types::{Frame, RoomId, ServerEvent, UserId};

pub type SessionId = Uuid;

/// Why a frame could not be queued for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    /// The session's outbound queue is at capacity.
    Full,
    /// The session's writer has gone away.
    Closed,
}

/// The hub's view of a connected session: a bounded outbound queue plus an
/// eviction signal the connection task listens on.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    session_id: SessionId,
    user_id: UserId,
    outbound: mpsc::Sender<Frame>,
    evicted: Arc<Notify>,
}

impl SessionHandle {
    pub fn new(user_id: UserId, buffer: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (outbound, receiver) = mpsc::channel(buffer.max(1));
        let handle = Self {
            session_id: Uuid::new_v4(),
            user_id,
            outbound,
            evicted: Arc::new(Notify::new()),
        };
        (handle, receiver)
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Queue a frame without waiting.
    pub fn try_deliver(&self, frame: Frame) -> Result<(), DeliveryError> {
        self.outbound.try_send(frame).map_err(|err| match err {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    /// Resolves once the hub has dropped this session. A signal raised
    /// before anyone waits is kept until the next call.
    pub async fn evicted(&self) {
        self.evicted.notified().await;
    }

    pub(crate) fn evict(&self) {
        self.evicted.notify_one();
    }
}

#[derive(Default)]
struct RoomChannel {
    subscribers: Mutex<HashMap<SessionId, SessionHandle>>,
    ordering: Arc<Mutex<()>>,
}

/// Maps room ids to the sessions subscribed to them.
///
/// Every room owns its own subscriber lock, so fan-out in one room never waits
/// on another. Publishing holds that lock for the whole fan-out, which makes
/// the order `publish` accepts events the order every subscriber sees them.
/// Delivery is a non-blocking enqueue; a subscriber whose queue is full or
/// closed is dropped from the room and told so through its eviction signal.
#[derive(Default)]
pub struct BroadcastHub {
    rooms: RwLock<HashMap<RoomId, Arc<RoomChannel>>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    async fn channel(&self, room_id: RoomId) -> Arc<RoomChannel> {
        if let Some(channel) = self.rooms.read().await.get(&room_id) {
            return channel.clone();
        }

        self.rooms
            .write()
            .await
            .entry(room_id)
            .or_default()
            .clone()
    }

    async fn existing_channel(&self, room_id: RoomId) -> Option<Arc<RoomChannel>> {
        self.rooms.read().await.get(&room_id).cloned()
    }

    /// Add a session to a room. Returns `false` if it was already subscribed.
    pub async fn subscribe(&self, room_id: RoomId, handle: SessionHandle) -> bool {
        let channel = self.channel(room_id).await;
        let mut subscribers = channel.subscribers.lock().await;

        if subscribers.contains_key(&handle.session_id) {
            return false;
        }

        debug!(room_id, session_id = %handle.session_id, user_id = handle.user_id, "session subscribed");
        subscribers.insert(handle.session_id, handle);
        true
    }

    /// Remove a session from a room. Returns `false` if it was not subscribed.
    pub async fn unsubscribe(&self, room_id: RoomId, session_id: SessionId) -> bool {
        let Some(channel) = self.existing_channel(room_id).await else {
            return false;
        };

        let removed = channel.subscribers.lock().await.remove(&session_id).is_some();
        if removed {
            debug!(room_id, %session_id, "session unsubscribed");
        }
        removed
    }

    /// Serialize once and enqueue to every subscriber of the room.
    /// Returns the number of sessions the event was queued for.
    pub async fn publish(&self, room_id: RoomId, event: &ServerEvent) -> usize {
        let frame = match event.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(room_id, command = event.command_name(), error = %e, "failed to serialize event");
                return 0;
            }
        };

        let delivered = self.publish_frame(room_id, frame).await;
        debug!(room_id, command = event.command_name(), delivered, "published event");
        delivered
    }

    async fn publish_frame(&self, room_id: RoomId, frame: Frame) -> usize {
        let Some(channel) = self.existing_channel(room_id).await else {
            return 0;
        };

        let mut subscribers = channel.subscribers.lock().await;
        let mut delivered = 0;
        let mut dropped = Vec::new();

        for (session_id, handle) in subscribers.iter() {
            match handle.try_deliver(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(DeliveryError::Full) => {
                    warn!(room_id, %session_id, user_id = handle.user_id, "subscriber queue full, disconnecting");
                    dropped.push(*session_id);
                }
                Err(DeliveryError::Closed) => {
                    debug!(room_id, %session_id, "subscriber already gone");
                    dropped.push(*session_id);
                }
            }
        }

        for session_id in dropped {
            if let Some(handle) = subscribers.remove(&session_id) {
                handle.evict();
            }
        }

        delivered
    }

    /// Take the room's commit-then-publish turn.
    ///
    /// Writers hold the guard from their store commit until their publish
    /// returns, so delivery order matches commit order.
    pub async fn ordering_lock(&self, room_id: RoomId) -> OwnedMutexGuard<()> {
        let ordering = self.channel(room_id).await.ordering.clone();
        ordering.lock_owned().await
    }

    /// Run `commit` and publish the event it yields while holding the room's
    /// ordering turn. Nothing is published when `commit` fails.
    pub async fn publish_after<F, Fut, T, E>(&self, room_id: RoomId, commit: F) -> Result<(T, usize), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(T, ServerEvent), E>>,
    {
        let _turn = self.ordering_lock(room_id).await;
        let (value, event) = commit().await?;
        let delivered = self.publish(room_id, &event).await;
        Ok((value, delivered))
    }

    pub async fn subscriber_count(&self, room_id: RoomId) -> usize {
        match self.existing_channel(room_id).await {
            Some(channel) => channel.subscribers.lock().await.len(),
            None => 0,
        }
    }

    pub async fn is_subscribed(&self, room_id: RoomId, session_id: SessionId) -> bool {
        match self.existing_channel(room_id).await {
            Some(channel) => channel.subscribers.lock().await.contains_key(&session_id),
            None => false,
        }
    }

    /// Rooms with at least one subscriber.
    pub async fn active_room_count(&self) -> usize {
        let channels: Vec<_> = self.rooms.read().await.values().cloned().collect();
        let mut active = 0;
        for channel in channels {
            if !channel.subscribers.lock().await.is_empty() {
                active += 1;
            }
        }
        active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn error_event(text: &str) -> ServerEvent {
        ServerEvent::error(text)
    }

    fn parse(frame: &Frame) -> ServerEvent {
        serde_json::from_str(frame).unwrap()
    }

    #[tokio::test]
    async fn subscribe_is_idempotent() {
        let hub = BroadcastHub::new();
        let (handle, _rx) = SessionHandle::new(1, 8);

        assert!(hub.subscribe(7, handle.clone()).await);
        assert!(!hub.subscribe(7, handle.clone()).await);
        assert_eq!(hub.subscriber_count(7).await, 1);
    }

    #[tokio::test]
    async fn unsubscribe_twice_is_a_no_op() {
        let hub = BroadcastHub::new();
        let (handle, _rx) = SessionHandle::new(1, 8);
        hub.subscribe(7, handle.clone()).await;

        assert!(hub.unsubscribe(7, handle.session_id()).await);
        assert!(!hub.unsubscribe(7, handle.session_id()).await);
        assert!(!hub.unsubscribe(99, handle.session_id()).await);
        assert_eq!(hub.subscriber_count(7).await, 0);
    }

    #[tokio::test]
    async fn publish_reaches_only_the_target_room() {
        let hub = BroadcastHub::new();
        let (a, mut rx_a) = SessionHandle::new(1, 8);
        let (b, mut rx_b) = SessionHandle::new(2, 8);
        let (other, mut rx_other) = SessionHandle::new(3, 8);
        hub.subscribe(1, a).await;
        hub.subscribe(1, b).await;
        hub.subscribe(2, other).await;

        let delivered = hub.publish(1, &error_event("hello")).await;

        assert_eq!(delivered, 2);
        assert_eq!(parse(&rx_a.try_recv().unwrap()), error_event("hello"));
        assert_eq!(parse(&rx_b.try_recv().unwrap()), error_event("hello"));
        assert!(rx_other.try_recv().is_err());
    }

    #[tokio::test]
    async fn publish_to_empty_room_delivers_nothing() {
        let hub = BroadcastHub::new();
        assert_eq!(hub.publish(5, &error_event("nobody")).await, 0);
    }

    #[tokio::test]
    async fn closed_subscriber_is_dropped_without_affecting_others() {
        let hub = BroadcastHub::new();
        let (gone, rx_gone) = SessionHandle::new(1, 8);
        let (alive, mut rx_alive) = SessionHandle::new(2, 8);
        hub.subscribe(1, gone.clone()).await;
        hub.subscribe(1, alive).await;
        drop(rx_gone);

        let delivered = hub.publish(1, &error_event("still here")).await;

        assert_eq!(delivered, 1);
        assert!(rx_alive.try_recv().is_ok());
        assert!(!hub.is_subscribed(1, gone.session_id()).await);
    }

    #[tokio::test]
    async fn full_subscriber_is_evicted() {
        let hub = BroadcastHub::new();
        let (slow, _rx_slow) = SessionHandle::new(1, 1);
        let (fast, mut rx_fast) = SessionHandle::new(2, 8);
        hub.subscribe(1, slow.clone()).await;
        hub.subscribe(1, fast).await;

        assert_eq!(hub.publish(1, &error_event("one")).await, 2);
        assert_eq!(hub.publish(1, &error_event("two")).await, 1);

        tokio::time::timeout(Duration::from_secs(1), slow.evicted())
            .await
            .expect("slow subscriber should be told it was evicted");
        assert!(!hub.is_subscribed(1, slow.session_id()).await);
        assert_eq!(hub.subscriber_count(1).await, 1);
        assert!(rx_fast.try_recv().is_ok());
        assert!(rx_fast.try_recv().is_ok());
    }

    #[tokio::test]
    async fn concurrent_publishers_share_one_order() {
        let hub = Arc::new(BroadcastHub::new());
        let (a, mut rx_a) = SessionHandle::new(1, 256);
        let (b, mut rx_b) = SessionHandle::new(2, 256);
        hub.subscribe(1, a).await;
        hub.subscribe(1, b).await;

        let mut tasks = Vec::new();
        for publisher in 0..4 {
            let hub = hub.clone();
            tasks.push(tokio::spawn(async move {
                for n in 0..25 {
                    hub.publish(1, &error_event(&format!("{publisher}-{n}"))).await;
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let mut seen_a = Vec::new();
        while let Ok(frame) = rx_a.try_recv() {
            seen_a.push(frame.to_string());
        }
        let mut seen_b = Vec::new();
        while let Ok(frame) = rx_b.try_recv() {
            seen_b.push(frame.to_string());
        }

        assert_eq!(seen_a.len(), 100);
        assert_eq!(seen_a, seen_b);
    }

    #[tokio::test]
    async fn ordering_lock_serializes_writers() {
        let hub = Arc::new(BroadcastHub::new());
        let guard = hub.ordering_lock(3).await;

        let contender = {
            let hub = hub.clone();
            tokio::spawn(async move {
                let _turn = hub.ordering_lock(3).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn active_room_count_ignores_emptied_rooms() {
        let hub = BroadcastHub::new();
        let (a, _rx_a) = SessionHandle::new(1, 8);
        let (b, _rx_b) = SessionHandle::new(2, 8);
        hub.subscribe(1, a.clone()).await;
        hub.subscribe(2, b).await;
        hub.unsubscribe(1, a.session_id()).await;

        assert_eq!(hub.active_room_count().await, 1);
    }

    #[tokio::test]
    async fn publish_after_skips_publish_when_commit_fails() {
        let hub = BroadcastHub::new();
        let (handle, mut rx) = SessionHandle::new(1, 4);
        hub.subscribe(5, handle).await;

        let failed: Result<((), usize), &str> = hub
            .publish_after(5, || async { Err("rolled back") })
            .await;
        assert_eq!(failed, Err("rolled back"));
        assert!(rx.try_recv().is_err());

        let (value, delivered) = hub
            .publish_after(5, || async { Ok::<_, &str>((7, error_event("committed"))) })
            .await
            .unwrap();
        assert_eq!((value, delivered), (7, 1));
        assert!(rx.try_recv().unwrap().contains("committed"));
    }
}
