//! Chat wire protocol.
//!
//! Inbound (client → server):
//!
//! ```json
//! { "message": "hi", "receiver_id": 2 }
//! ```
//!
//! Outbound (server → client), either a chat message or an error:
//!
//! ```json
//! { "message": "hi", "sender_id": 1, "sender_username": "ana",
//!   "timestamp": "2026-01-01 10:00:00", "message_id": 17 }
//! { "error": "Message cannot be empty", "type": "error" }
//! ```
//!
//! [`InboundMessage::parse`] runs the payload-only validation steps (format,
//! receiver presence, non-empty text) in the order the session relies on.
//! Receiver existence and persistence are checked by the session against the
//! gateway.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ChatError;
use crate::gateway::{Identity, SavedMessage};
use crate::ids::{MessageId, UserId};

/// How the payload named its receiver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReceiverRef {
    /// An integer id (number or numeric string).
    Id(UserId),
    /// Present but not an id; can never match a user.
    Unresolvable(String),
}

impl ReceiverRef {
    /// Interpret a `receiver_id` value. `None` means "missing": absent,
    /// null, `false`, `0`, `""`, or an empty array/object.
    pub fn from_value(value: Option<&Value>) -> Option<Self> {
        match value? {
            Value::Null | Value::Bool(false) => None,
            Value::Number(n) => match n.as_i64() {
                Some(0) => None,
                Some(id) => Some(Self::Id(UserId::new(id))),
                None if n.as_f64().is_some_and(|f| f.abs() < f64::EPSILON) => None,
                None => Some(Self::Unresolvable(n.to_string())),
            },
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(
                s.parse::<UserId>()
                    .map_or_else(|_| Self::Unresolvable(s.clone()), Self::Id),
            ),
            Value::Array(a) if a.is_empty() => None,
            Value::Object(o) if o.is_empty() => None,
            other => Some(Self::Unresolvable(other.to_string())),
        }
    }

    /// The user id, if the reference is one.
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Unresolvable(_) => None,
        }
    }
}

impl std::fmt::Display for ReceiverRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Unresolvable(raw) => f.write_str(raw),
        }
    }
}

/// A validated inbound chat payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    /// Who the message is addressed to.
    pub receiver: ReceiverRef,
    /// Message text exactly as sent (not trimmed).
    pub content: String,
}

impl InboundMessage {
    /// Parse and validate a raw payload.
    ///
    /// Order: well-formed JSON object → `receiver_id` present → `message`
    /// non-empty after trimming. The first failing check wins.
    pub fn parse(raw: &str) -> Result<Self, ChatError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| ChatError::MalformedPayload(e.to_string()))?;
        let Value::Object(fields) = value else {
            return Err(ChatError::MalformedPayload("payload is not an object".into()));
        };

        let content = match fields.get("message") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(_) => {
                return Err(ChatError::MalformedPayload("message must be a string".into()));
            }
        };

        let receiver =
            ReceiverRef::from_value(fields.get("receiver_id")).ok_or(ChatError::MissingReceiver)?;

        if content.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        Ok(Self { receiver, content })
    }
}

/// A chat message broadcast to every member of a room.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessageEvent {
    /// Message text.
    pub message: String,
    /// Author.
    pub sender_id: UserId,
    /// Author's display name.
    pub sender_username: String,
    /// Persisted creation time (`%Y-%m-%d %H:%M:%S`).
    pub timestamp: String,
    /// Persisted message id.
    pub message_id: MessageId,
}

impl ChatMessageEvent {
    /// Build the broadcast event for a message that was just persisted.
    pub fn from_saved(sender: &Identity, content: &str, saved: &SavedMessage) -> Self {
        Self {
            message: content.to_owned(),
            sender_id: sender.user_id,
            sender_username: sender.username.clone(),
            timestamp: saved.wire_timestamp(),
            message_id: saved.id,
        }
    }
}

/// An error reported to a single session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    /// Human-readable reason.
    pub error: String,
    /// Always `"error"`.
    #[serde(rename = "type")]
    pub event_type: String,
}

impl ErrorEvent {
    /// Error event carrying `reason`.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            error: reason.into(),
            event_type: "error".into(),
        }
    }
}

impl From<&ChatError> for ErrorEvent {
    fn from(err: &ChatError) -> Self {
        Self::new(err.client_reason())
    }
}

/// Any event sent from the server to a chat client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatEvent {
    /// Room broadcast of a persisted message.
    ChatMessage(ChatMessageEvent),
    /// Per-session error.
    Error(ErrorEvent),
}

impl ChatEvent {
    /// Event name for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ChatMessage(_) => "chat_message",
            Self::Error(_) => "error",
        }
    }

    /// Serialize to the JSON text sent over the socket.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<&ChatError> for ChatEvent {
    fn from(err: &ChatError) -> Self {
        Self::Error(ErrorEvent::from(err))
    }
}
