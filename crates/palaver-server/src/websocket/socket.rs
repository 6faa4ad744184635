//! Socket driver for one chat connection.
//!
//! Splits the upgraded socket into a writer task (outbound queue plus
//! pings) and a reader loop that feeds inbound frames to the
//! [`ChatSession`]. A heartbeat task cancels the connection when the client
//! goes silent.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge};
use palaver_core::{ChatError, Credentials, RoomName, SessionId};
use palaver_telemetry::metrics::{
    WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_DISCONNECTIONS_TOTAL,
};
use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::connection::ClientConnection;
use super::heartbeat::{HeartbeatResult, run_heartbeat};
use crate::chat::session::{ChatContext, ChatSession, REASON_UNAUTHENTICATED};
use crate::config::ServerConfig;

/// Close code sent when no identity could be resolved.
pub const CLOSE_UNAUTHENTICATED: u16 = 4401;
/// Close code sent when the admission policy refuses the room.
pub const CLOSE_FORBIDDEN: u16 = 4403;

/// Close code for a failed admission.
pub fn admission_close_code(err: &ChatError) -> u16 {
    match err {
        ChatError::AdmissionDenied(reason) if reason == REASON_UNAUTHENTICATED => {
            CLOSE_UNAUTHENTICATED
        }
        _ => CLOSE_FORBIDDEN,
    }
}

/// Serve one upgraded socket until the client leaves, goes silent, or
/// `shutdown` fires.
pub async fn run_ws_session(
    socket: WebSocket,
    ctx: ChatContext,
    room: RoomName,
    credentials: Credentials,
    config: ServerConfig,
    shutdown: CancellationToken,
) {
    let (tx, rx) = mpsc::channel(config.send_queue_capacity.max(1));
    let conn = Arc::new(ClientConnection::new(SessionId::new(), tx));
    let session_id = conn.id.clone();
    let mut session = ChatSession::new(ctx, room, Arc::clone(&conn));
    let (mut sink, mut stream) = socket.split();

    let admitted = session.admit(&credentials).await.map(|identity| identity.user_id);
    match admitted {
        Ok(user_id) => {
            info!(
                session_id = %session_id,
                user_id = %user_id,
                room = %session.room(),
                "chat connection opened"
            );
        }
        Err(err) => {
            let frame = CloseFrame {
                code: admission_close_code(&err),
                reason: err.client_reason().into(),
            };
            let _ = sink.send(Message::Close(Some(frame))).await;
            return;
        }
    }

    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    let cancel = shutdown.child_token();
    let mut writer = tokio::spawn(write_loop(sink, rx, config.heartbeat_interval, cancel.clone()));
    let heartbeat = {
        let conn = Arc::clone(&conn);
        let cancel = cancel.clone();
        let (interval, timeout) = (config.heartbeat_interval, config.heartbeat_timeout);
        tokio::spawn(async move {
            if run_heartbeat(conn, interval, timeout, cancel.clone()).await
                == HeartbeatResult::TimedOut
            {
                warn!(session_id = %session_id, "heartbeat timed out, closing");
                cancel.cancel();
            }
        })
    };

    loop {
        let frame = tokio::select! {
            frame = stream.next() => frame,
            () = cancel.cancelled() => break,
        };
        let msg = match frame {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => {
                debug!(session_id = %conn.id, error = %e, "socket read failed");
                break;
            }
            None => break,
        };
        conn.mark_alive();
        match msg {
            Message::Text(text) => {
                let _ = session.receive(text.as_str()).await;
            }
            Message::Binary(bytes) => match std::str::from_utf8(&bytes) {
                Ok(text) => {
                    let _ = session.receive(text).await;
                }
                Err(_) => debug!(session_id = %conn.id, len = bytes.len(), "ignoring non-UTF-8 binary frame"),
            },
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    session.close();
    cancel.cancel();
    let _ = heartbeat.await;
    if time::timeout(config.shutdown_timeout, &mut writer).await.is_err() {
        warn!(session_id = %conn.id, "writer did not drain in time, aborting");
        writer.abort();
    }

    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    info!(
        session_id = %conn.id,
        dropped = conn.drop_count(),
        age_secs = conn.age().as_secs(),
        "chat connection closed"
    );
}

async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Arc<String>>,
    ping_every: Duration,
    cancel: CancellationToken,
) {
    let mut ping = time::interval(ping_every);
    let _ = ping.tick().await;

    loop {
        tokio::select! {
            biased;
            frame = rx.recv() => {
                let Some(text) = frame else { break };
                if sink.send(Message::Text(text.as_str().into())).await.is_err() {
                    break;
                }
            }
            () = cancel.cancelled() => {
                let frame = CloseFrame { code: close_code::AWAY, reason: "going away".into() };
                let _ = sink.send(Message::Close(Some(frame))).await;
                break;
            }
            _ = ping.tick() => {
                if sink.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }
        }
    }
}
