//! Async collaborator implementations over the SQLite repositories.
//!
//! rusqlite is synchronous, so every call hops onto the blocking pool with
//! [`tokio::task::spawn_blocking`]. No async caller ever holds the
//! connection mutex.

use async_trait::async_trait;
use palaver_core::{
    Authenticator, Credentials, FriendshipLookup, GatewayError, Identity, PersistenceGateway,
    SavedMessage, UserId,
};
use tracing::warn;

use crate::database::Database;
use crate::error::Result;
use crate::friends::FriendRepo;
use crate::messages::MessageRepo;
use crate::tokens::TokenRepo;
use crate::users::UserRepo;

/// SQLite-backed persistence gateway, friendship lookup and authenticator.
#[derive(Clone)]
pub struct SqliteGateway {
    db: Database,
}

impl SqliteGateway {
    /// Gateway over `db`.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// The underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Run a synchronous store operation on the blocking pool.
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db)).await?
    }
}

#[async_trait]
impl PersistenceGateway for SqliteGateway {
    async fn user_exists(&self, user_id: UserId) -> std::result::Result<bool, GatewayError> {
        Ok(self
            .run(move |db| UserRepo::new(db.clone()).exists(user_id))
            .await?)
    }

    async fn save_message(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
        content: &str,
    ) -> std::result::Result<SavedMessage, GatewayError> {
        let content = content.to_owned();
        let row = self
            .run(move |db| MessageRepo::new(db.clone()).save(sender_id, receiver_id, &content, None))
            .await?;
        Ok(SavedMessage {
            id: row.id,
            timestamp: row.timestamp,
        })
    }
}

#[async_trait]
impl FriendshipLookup for SqliteGateway {
    async fn are_friends(&self, a: UserId, b: UserId) -> std::result::Result<bool, GatewayError> {
        Ok(self
            .run(move |db| FriendRepo::new(db.clone()).are_friends(a, b))
            .await?)
    }
}

#[async_trait]
impl Authenticator for SqliteGateway {
    async fn current_authenticated_user(&self, credentials: &Credentials) -> Option<Identity> {
        let token = credentials.bearer.clone()?;
        match self
            .run(move |db| TokenRepo::new(db.clone()).resolve(&token))
            .await
        {
            Ok(identity) => identity,
            Err(e) => {
                warn!(error = %e, "token lookup failed, treating as anonymous");
                None
            }
        }
    }
}
