//! Collaborator interfaces consumed by the chat core.
//!
//! The core never talks to a database or an identity provider directly. It
//! asks these traits, which `palaver-store` implements over SQLite and tests
//! implement with in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::GatewayError;
use crate::ids::{MessageId, UserId};

/// Timestamp layout used on the chat wire.
pub const WIRE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// An authenticated principal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// User primary key.
    pub user_id: UserId,
    /// Name shown to other participants.
    pub username: String,
}

impl Identity {
    /// Build an identity.
    pub fn new(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}

/// Credentials presented with a request or connection attempt.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Opaque bearer token, if any was supplied.
    pub bearer: Option<String>,
}

impl Credentials {
    /// Credentials carrying a bearer token.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            bearer: Some(token.into()),
        }
    }

    /// No credentials at all.
    pub fn anonymous() -> Self {
        Self::default()
    }
}

/// Result of persisting a chat message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavedMessage {
    /// Assigned message id.
    pub id: MessageId,
    /// Creation time as stored.
    pub timestamp: DateTime<Utc>,
}

impl SavedMessage {
    /// Timestamp rendered for the chat wire (`%Y-%m-%d %H:%M:%S`, UTC).
    pub fn wire_timestamp(&self) -> String {
        self.timestamp.format(WIRE_TIMESTAMP_FORMAT).to_string()
    }
}

/// Storage for chat messages and user existence checks.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Whether `user_id` names an existing user.
    async fn user_exists(&self, user_id: UserId) -> Result<bool, GatewayError>;

    /// Persist a message and return its id and timestamp.
    async fn save_message(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
        content: &str,
    ) -> Result<SavedMessage, GatewayError>;
}

/// Resolves presented credentials to an identity.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// The authenticated user, or `None` for anonymous/invalid credentials.
    async fn current_authenticated_user(&self, credentials: &Credentials) -> Option<Identity>;
}

/// Friendship relation lookups.
#[async_trait]
pub trait FriendshipLookup: Send + Sync {
    /// Whether `a` and `b` are friends.
    async fn are_friends(&self, a: UserId, b: UserId) -> Result<bool, GatewayError>;
}
