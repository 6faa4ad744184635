//! Outbound handle for one connected chat client.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use palaver_core::{ChatEvent, SessionId};
use parking_lot::Mutex;
use tokio::sync::mpsc;

/// A room member: the outbound side of one chat socket.
///
/// Room broadcasts and per-session error events are queued here without
/// awaiting. The socket's writer task drains the queue; when it is full or
/// the writer is gone the event is dropped for this member only.
pub struct ClientConnection {
    /// Owning chat session.
    pub id: SessionId,
    tx: mpsc::Sender<Arc<String>>,
    connected_at: Instant,
    /// Set by inbound traffic, cleared by each heartbeat check.
    pub is_alive: AtomicBool,
    last_seen: Mutex<Instant>,
    dropped: AtomicU64,
}

impl ClientConnection {
    /// Member for session `id`, queueing frames into `tx`.
    pub fn new(id: SessionId, tx: mpsc::Sender<Arc<String>>) -> Self {
        let now = Instant::now();
        Self {
            id,
            tx,
            connected_at: now,
            is_alive: AtomicBool::new(true),
            last_seen: Mutex::new(now),
            dropped: AtomicU64::new(0),
        }
    }

    /// Queue an already serialized frame. A room broadcast shares one
    /// `Arc` across every member.
    ///
    /// `false` means the frame was dropped and counted.
    pub fn send(&self, frame: Arc<String>) -> bool {
        let queued = self.tx.try_send(frame).is_ok();
        if !queued {
            let _ = self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        queued
    }

    /// Serialize `event` and queue it for this member alone.
    pub fn send_event(&self, event: &ChatEvent) -> bool {
        event
            .to_json()
            .is_ok_and(|json| self.send(Arc::new(json)))
    }

    /// Broadcasts and error events this member never received.
    pub fn drop_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// The client sent something: a chat payload, a Pong, anything.
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_seen.lock() = Instant::now();
    }

    /// Silence since the last inbound frame, or since the socket opened.
    pub fn last_seen_elapsed(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }

    /// Heartbeat probe: whether the client spoke since the previous probe.
    /// Clears the flag.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Time since the socket was admitted.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
