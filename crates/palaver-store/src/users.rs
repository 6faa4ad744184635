//! User accounts.

use chrono::{DateTime, Utc};
use palaver_core::UserId;
use rusqlite::OptionalExtension;
use serde::Serialize;
use tracing::instrument;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::row_helpers::{self, format_timestamp, parse_timestamp};

/// A stored user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UserRow {
    /// Primary key.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Optional friendly name.
    pub display_name: Option<String>,
    /// Account creation time.
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    /// Display name if set, else the username.
    pub fn shown_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}

pub(crate) const USER_COLUMNS: &str = "id, username, display_name, created_at";

pub(crate) fn row_to_user(row: &rusqlite::Row<'_>) -> Result<UserRow> {
    let created: String = row_helpers::get(row, 3, "users", "created_at")?;
    Ok(UserRow {
        id: UserId::new(row_helpers::get(row, 0, "users", "id")?),
        username: row_helpers::get(row, 1, "users", "username")?,
        display_name: row_helpers::get(row, 2, "users", "display_name")?,
        created_at: parse_timestamp(&created, "users", "created_at")?,
    })
}

/// Repository for the `users` table.
pub struct UserRepo {
    db: Database,
}

impl UserRepo {
    /// Repository over `db`.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a user. A taken username is [`StoreError::Conflict`].
    #[instrument(skip(self, display_name))]
    pub fn create(&self, username: &str, display_name: Option<&str>) -> Result<UserRow> {
        let username = username.trim();
        if username.is_empty() {
            return Err(StoreError::Conflict("username must not be empty".into()));
        }
        let now = Utc::now();

        self.db.with_conn(|conn| {
            let _ = conn
                .execute(
                    "INSERT INTO users (username, display_name, created_at) VALUES (?1, ?2, ?3)",
                    rusqlite::params![username, display_name, format_timestamp(now)],
                )
                .map_err(|e| match StoreError::from(e) {
                    StoreError::Conflict(_) => {
                        StoreError::Conflict(format!("username {username:?} is taken"))
                    }
                    other => other,
                })?;

            Ok(UserRow {
                id: UserId::new(conn.last_insert_rowid()),
                username: username.to_string(),
                display_name: display_name.map(str::to_string),
                created_at: now,
            })
        })
    }

    /// Fetch a user by id.
    pub fn get(&self, id: UserId) -> Result<UserRow> {
        self.find(id)?
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))
    }

    /// Fetch a user by id, `None` if absent.
    pub fn find(&self, id: UserId) -> Result<Option<UserRow>> {
        self.db.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))?;
            let mut rows = stmt.query([id.get()])?;
            rows.next()?.map(row_to_user).transpose()
        })
    }

    /// Fetch a user by username, `None` if absent.
    pub fn find_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.db.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"))?;
            let mut rows = stmt.query([username])?;
            rows.next()?.map(row_to_user).transpose()
        })
    }

    /// Whether a user with this id exists.
    pub fn exists(&self, id: UserId) -> Result<bool> {
        self.db.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row("SELECT 1 FROM users WHERE id = ?1", [id.get()], |row| row.get(0))
                .optional()?;
            Ok(found.is_some())
        })
    }
}
