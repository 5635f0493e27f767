//! Chat WebSocket handler: one connection, one room.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use huddle_chats::{ChatServices, ChatSession};
use huddle_database::User;
use tracing::{debug, warn};

use crate::middleware::CurrentUser;
use crate::state::GatewayState;

/// How long queued frames may take to flush once the client is leaving.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    ClientClosed,
    Evicted,
    SocketError,
}

/// Upgrade the connection; the handshake itself runs inside the socket so
/// rejections reach the client as `error_message` frames.
pub async fn chat_websocket_handler(
    ws: WebSocketUpgrade,
    Path(room): Path<String>,
    State(state): State<Arc<GatewayState>>,
    CurrentUser(user): CurrentUser,
) -> Response {
    let services = state.services.clone();
    ws.on_upgrade(move |socket| handle_chat_websocket(socket, services, user, room))
}

async fn handle_chat_websocket(
    socket: WebSocket,
    services: ChatServices,
    user: Option<User>,
    room: String,
) {
    let (mut sender, mut receiver) = socket.split();
    let (mut session, mut outbound) = ChatSession::new(services, user);

    if !session.open(&room).await {
        while let Ok(frame) = outbound.try_recv() {
            if sender.send(Message::Text(frame.to_string())).await.is_err() {
                return;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
        return;
    }

    let session_id = session.id();
    let mut writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if sender.send(Message::Text(frame.to_string())).await.is_err() {
                return;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    });

    let eviction = session.session_handle().clone();
    let exit = loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => session.handle_text(&text).await,
                Some(Ok(Message::Close(_))) | None => break Exit::ClientClosed,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(%session_id, error = %e, "websocket receive failed");
                    break Exit::SocketError;
                }
            },
            _ = eviction.evicted() => {
                warn!(%session_id, "session evicted by the broadcast hub");
                break Exit::Evicted;
            }
        }
    };

    session.close().await;
    // The writer ends once every sender of its queue is gone.
    drop(eviction);
    drop(session);

    if exit == Exit::Evicted {
        writer.abort();
        return;
    }
    if tokio::time::timeout(FLUSH_TIMEOUT, &mut writer).await.is_err() {
        writer.abort();
    }
    debug!(%session_id, ?exit, "websocket connection finished");
}
