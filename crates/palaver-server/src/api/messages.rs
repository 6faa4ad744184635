//! Message history, read receipts and the HTTP send path.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use metrics::counter;
use palaver_core::{
    ChatEvent, ChatMessageEvent, Identity, MessageId, ReceiverRef, RoomKey, SavedMessage, UserId,
    canonical_room_name,
};
use palaver_store::{FriendRepo, MessageRepo, MessageRow, UserRepo};
use palaver_telemetry::metrics::CHAT_MESSAGES_TOTAL;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::{ApiError, friend_not_found, path_user_id};
use crate::auth::AuthUser;
use crate::server::AppState;

/// A stored message as seen by one participant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageView {
    /// Message id.
    pub id: MessageId,
    /// Text (may be empty for media-only messages).
    pub content: String,
    /// Attached media reference.
    pub media_url: Option<String>,
    /// Author id.
    pub sender_id: UserId,
    /// Author username.
    pub sender_username: String,
    /// RFC 3339 creation time.
    pub timestamp: String,
    /// Whether the viewer wrote it.
    pub is_sent: bool,
}

impl MessageView {
    fn new(row: MessageRow, sender_username: String, viewer: UserId) -> Self {
        Self {
            id: row.id,
            is_sent: row.sender_id == viewer,
            sender_id: row.sender_id,
            sender_username,
            timestamp: row.timestamp.to_rfc3339(),
            content: row.content,
            media_url: row.media_url,
        }
    }
}

/// `GET /api/messages/{friend_id}` body.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// Oldest first.
    pub messages: Vec<MessageView>,
}

/// `GET /api/messages/{friend_id}`
#[instrument(skip_all, fields(user_id = %me.user_id, friend_id = %friend_id))]
pub async fn history(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
    Path(friend_id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let friend = path_user_id(&friend_id).ok_or_else(friend_not_found)?;
    let (viewer, limit) = (me.user_id, state.config.history_limit);

    let (friend_row, rows) = state
        .store
        .run(move |db| {
            let Some(friend_row) = UserRepo::new(db.clone()).find(friend)? else {
                return Ok(None);
            };
            let rows = MessageRepo::new(db.clone()).history(viewer, friend, limit)?;
            Ok(Some((friend_row, rows)))
        })
        .await?
        .ok_or_else(friend_not_found)?;

    let messages = rows
        .into_iter()
        .map(|row| {
            let author = if row.sender_id == viewer {
                me.username.clone()
            } else {
                friend_row.username.clone()
            };
            MessageView::new(row, author, viewer)
        })
        .collect();
    Ok(Json(HistoryResponse { messages }))
}

/// `POST /api/messages/{friend_id}/read` body.
#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    /// Messages flipped to read.
    pub updated: usize,
}

/// `POST /api/messages/{friend_id}/read`: mark everything the friend sent
/// to the caller as read.
#[instrument(skip_all, fields(user_id = %me.user_id, friend_id = %friend_id))]
pub async fn mark_read(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
    Path(friend_id): Path<String>,
) -> Result<Json<MarkReadResponse>, ApiError> {
    let friend = path_user_id(&friend_id).ok_or_else(friend_not_found)?;
    let reader = me.user_id;
    let updated = state
        .store
        .run(move |db| MessageRepo::new(db.clone()).mark_read(friend, reader))
        .await?;
    debug!(updated, "messages marked read");
    Ok(Json(MarkReadResponse { updated }))
}

/// `POST /api/send-message` request body.
#[derive(Debug, Default, Deserialize)]
pub struct SendMessageRequest {
    /// Receiver id, number or numeric string.
    #[serde(default)]
    pub receiver_id: Option<Value>,
    /// Message text.
    #[serde(default)]
    pub content: Option<String>,
    /// Reference to already-uploaded media.
    #[serde(default)]
    pub media_url: Option<String>,
}

/// `POST /api/send-message` response body.
#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    /// Always `true`.
    pub success: bool,
    /// The stored message.
    pub message: MessageView,
}

enum SendOutcome {
    NoReceiver,
    NotFriends,
    Saved(MessageRow),
}

/// `POST /api/send-message`: persist a message to a friend and publish it
/// to the pair's room.
#[instrument(skip_all, fields(user_id = %me.user_id))]
pub async fn send(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
    body: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let receiver = ReceiverRef::from_value(req.receiver_id.as_ref())
        .ok_or_else(|| ApiError::BadRequest("Receiver ID is required".into()))?;
    let content = req.content.unwrap_or_default();
    let media_url = req.media_url.filter(|m| !m.trim().is_empty());
    if content.trim().is_empty() && media_url.is_none() {
        return Err(ApiError::BadRequest(
            "Message content or media is required".into(),
        ));
    }
    let receiver_not_found = || ApiError::NotFound("Receiver not found".into());
    let receiver_id = receiver.user_id().ok_or_else(receiver_not_found)?;

    let sender_id = me.user_id;
    let outcome = state
        .store
        .run(move |db| {
            if !UserRepo::new(db.clone()).exists(receiver_id)? {
                return Ok(SendOutcome::NoReceiver);
            }
            if !FriendRepo::new(db.clone()).are_friends(sender_id, receiver_id)? {
                return Ok(SendOutcome::NotFriends);
            }
            MessageRepo::new(db.clone())
                .save(sender_id, receiver_id, &content, media_url.as_deref())
                .map(SendOutcome::Saved)
        })
        .await?;

    let row = match outcome {
        SendOutcome::Saved(row) => row,
        SendOutcome::NoReceiver => return Err(receiver_not_found()),
        SendOutcome::NotFriends => {
            return Err(ApiError::Forbidden(
                "You can only send messages to friends".into(),
            ));
        }
    };
    counter!(CHAT_MESSAGES_TOTAL, "source" => "http").increment(1);
    info!(message_id = %row.id, receiver_id = %receiver_id, "message sent over http");

    publish_to_pair(&state, &me, receiver_id, &row);
    Ok(Json(SendMessageResponse {
        success: true,
        message: MessageView::new(row, me.username, sender_id),
    }))
}

fn publish_to_pair(state: &AppState, sender: &Identity, receiver: UserId, row: &MessageRow) {
    let room = RoomKey::for_room(&canonical_room_name(sender.user_id, receiver));
    let saved = SavedMessage {
        id: row.id,
        timestamp: row.timestamp,
    };
    let event = ChatEvent::ChatMessage(ChatMessageEvent::from_saved(sender, &row.content, &saved));
    match state.chat.groups.publish(&room, &event) {
        Ok(recipients) => debug!(room = %room, recipients, "http message published"),
        Err(e) => warn!(room = %room, error = %e, "http message stored but not published"),
    }
}
