//! Group messaging layer: room membership and fan-out.
//!
//! Rooms live in a sharded [`DashMap`]. Every operation on a room holds that
//! room's entry exclusively for its whole duration, so publishes to one room
//! are serialized (every member sees the same order) while unrelated rooms
//! proceed in parallel. Fan-out uses non-blocking sends; a slow member only
//! loses its own copy.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use metrics::{counter, gauge};
use palaver_core::{ChatError, ChatEvent, RoomKey, SessionId};
use palaver_telemetry::metrics::{CHAT_DELIVERY_DROPS_TOTAL, CHAT_ROOMS_ACTIVE};
use tracing::{debug, warn};

use crate::websocket::connection::ClientConnection;

type Members = HashMap<SessionId, Arc<ClientConnection>>;

/// Publish/subscribe fabric keyed by [`RoomKey`].
#[derive(Default)]
pub struct GroupLayer {
    rooms: DashMap<RoomKey, Members>,
}

impl GroupLayer {
    /// Create an empty room table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `member` to `room`. Joining twice is a no-op.
    ///
    /// Returns `true` if the member was not already present.
    pub fn join(&self, room: &RoomKey, member: Arc<ClientConnection>) -> bool {
        let added = {
            let mut members = self.rooms.entry(room.clone()).or_default();
            if members.contains_key(&member.id) {
                false
            } else {
                let _ = members.insert(member.id.clone(), member);
                true
            }
        };
        self.record_room_count();
        added
    }

    /// Remove `session_id` from `room`. Leaving a room one is not in is a
    /// no-op. Rooms left empty are dropped.
    pub fn leave(&self, room: &RoomKey, session_id: &SessionId) -> bool {
        let removed = self
            .rooms
            .get_mut(room)
            .is_some_and(|mut members| members.remove(session_id).is_some());
        let _ = self.rooms.remove_if(room, |_, members| members.is_empty());
        self.record_room_count();
        removed
    }

    /// Deliver `event` to every current member of `room`.
    ///
    /// The event is serialized once. Returns the number of members it was
    /// enqueued for; members whose queue is full or closed are skipped and
    /// counted as drops.
    pub fn publish(&self, room: &RoomKey, event: &ChatEvent) -> Result<usize, ChatError> {
        let json = Arc::new(
            event
                .to_json()
                .map_err(|e| ChatError::DeliveryFault(e.to_string()))?,
        );

        // Exclusive access: concurrent publishes to this room wait here.
        let Some(members) = self.rooms.get_mut(room) else {
            debug!(room = %room, "publish to empty room");
            return Ok(0);
        };

        let mut delivered = 0;
        for member in members.values() {
            if member.send(Arc::clone(&json)) {
                delivered += 1;
            } else {
                counter!(CHAT_DELIVERY_DROPS_TOTAL).increment(1);
                warn!(room = %room, session_id = %member.id, "dropped delivery to member");
            }
        }
        debug!(room = %room, kind = event.kind(), delivered, "published event");
        Ok(delivered)
    }

    /// Session ids currently in `room`.
    pub fn members(&self, room: &RoomKey) -> Vec<SessionId> {
        self.rooms
            .get(room)
            .map(|members| members.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of members in `room`.
    pub fn member_count(&self, room: &RoomKey) -> usize {
        self.rooms.get(room).map_or(0, |members| members.len())
    }

    /// Number of rooms with at least one member.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    #[allow(clippy::cast_precision_loss)]
    fn record_room_count(&self) {
        gauge!(CHAT_ROOMS_ACTIVE).set(self.rooms.len() as f64);
    }
}
