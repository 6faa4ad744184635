//! Opaque bearer tokens.
//!
//! A token is 32 random bytes, URL-safe base64 encoded and prefixed with
//! `plv_`. Only its SHA-256 digest is stored; the plaintext is returned once
//! by [`TokenRepo::issue`].

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use palaver_core::{Identity, UserId};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use crate::database::Database;
use crate::error::Result;
use crate::row_helpers::{self, format_timestamp, parse_timestamp};

const TOKEN_PREFIX: &str = "plv_";
const TOKEN_BYTES: usize = 32;

/// A freshly issued token. `token` is the only copy of the plaintext.
#[derive(Clone, Debug)]
pub struct IssuedToken {
    /// Plaintext bearer token.
    pub token: String,
    /// Owner.
    pub user_id: UserId,
    /// Expiry, if any.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Hex SHA-256 of a plaintext token.
pub fn hash_token(token: &str) -> String {
    Sha256::digest(token.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{TOKEN_PREFIX}{}", URL_SAFE_NO_PAD.encode(bytes))
}

/// Repository for the `auth_tokens` table.
pub struct TokenRepo {
    db: Database,
}

impl TokenRepo {
    /// Repository over `db`.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Issue a token for `user_id`, valid for `ttl` (forever if `None`).
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub fn issue(&self, user_id: UserId, ttl: Option<Duration>) -> Result<IssuedToken> {
        let token = generate_token();
        let now = Utc::now().trunc_subsecs(6);
        let expires_at = ttl.map(|ttl| now + ttl);

        self.db.with_conn(|conn| {
            let _ = conn.execute(
                "INSERT INTO auth_tokens (token_hash, user_id, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    hash_token(&token),
                    user_id.get(),
                    format_timestamp(now),
                    expires_at.map(format_timestamp)
                ],
            )?;
            Ok(())
        })?;

        Ok(IssuedToken {
            token,
            user_id,
            expires_at,
        })
    }

    /// Resolve a plaintext token to its owner.
    ///
    /// Unknown, revoked and expired tokens resolve to `None`.
    pub fn resolve(&self, token: &str) -> Result<Option<Identity>> {
        let hash = hash_token(token);
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.username, t.expires_at, t.revoked
                 FROM auth_tokens t JOIN users u ON u.id = t.user_id
                 WHERE t.token_hash = ?1",
            )?;
            let mut rows = stmt.query([hash])?;
            let Some(row) = rows.next()? else {
                return Ok(None);
            };

            let revoked: bool = row_helpers::get(row, 3, "auth_tokens", "revoked")?;
            if revoked {
                debug!("revoked token presented");
                return Ok(None);
            }
            let expires_at: Option<String> = row_helpers::get(row, 2, "auth_tokens", "expires_at")?;
            if let Some(raw) = expires_at {
                if parse_timestamp(&raw, "auth_tokens", "expires_at")? <= Utc::now() {
                    debug!("expired token presented");
                    return Ok(None);
                }
            }

            Ok(Some(Identity::new(
                UserId::new(row_helpers::get(row, 0, "users", "id")?),
                row_helpers::get::<String>(row, 1, "users", "username")?,
            )))
        })
    }

    /// Revoke a token. Returns whether it existed and was active.
    pub fn revoke(&self, token: &str) -> Result<bool> {
        let hash = hash_token(token);
        self.db.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE auth_tokens SET revoked = 1 WHERE token_hash = ?1 AND revoked = 0",
                [hash],
            )?;
            Ok(changed > 0)
        })
    }
}
