//! Direct chat messages between two users.

use chrono::{DateTime, SubsecRound, Utc};
use palaver_core::{MessageId, UserId};
use serde::Serialize;
use tracing::instrument;

use crate::database::Database;
use crate::error::Result;
use crate::row_helpers::{self, format_timestamp, parse_timestamp};

/// A stored chat message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageRow {
    /// Primary key.
    pub id: MessageId,
    /// Author.
    pub sender_id: UserId,
    /// Addressee.
    pub receiver_id: UserId,
    /// Text as sent. May be empty when `media_url` is set.
    pub content: String,
    /// Reference to externally stored media.
    pub media_url: Option<String>,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Whether the receiver has read it.
    pub is_read: bool,
}

const MESSAGE_COLUMNS: &str = "id, sender_id, receiver_id, content, media_url, timestamp, is_read";

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<MessageRow> {
    let ts: String = row_helpers::get(row, 5, "messages", "timestamp")?;
    Ok(MessageRow {
        id: MessageId::new(row_helpers::get(row, 0, "messages", "id")?),
        sender_id: UserId::new(row_helpers::get(row, 1, "messages", "sender_id")?),
        receiver_id: UserId::new(row_helpers::get(row, 2, "messages", "receiver_id")?),
        content: row_helpers::get(row, 3, "messages", "content")?,
        media_url: row_helpers::get(row, 4, "messages", "media_url")?,
        timestamp: parse_timestamp(&ts, "messages", "timestamp")?,
        is_read: row_helpers::get(row, 6, "messages", "is_read")?,
    })
}

/// Repository for the `messages` table.
pub struct MessageRepo {
    db: Database,
}

impl MessageRepo {
    /// Repository over `db`.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Persist a message stamped with the current time.
    #[instrument(skip(self, content, media_url), fields(sender = %sender, receiver = %receiver))]
    pub fn save(
        &self,
        sender: UserId,
        receiver: UserId,
        content: &str,
        media_url: Option<&str>,
    ) -> Result<MessageRow> {
        let now = Utc::now().trunc_subsecs(6);
        self.db.with_conn(|conn| {
            let _ = conn.execute(
                "INSERT INTO messages (sender_id, receiver_id, content, media_url, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    sender.get(),
                    receiver.get(),
                    content,
                    media_url,
                    format_timestamp(now)
                ],
            )?;
            Ok(MessageRow {
                id: MessageId::new(conn.last_insert_rowid()),
                sender_id: sender,
                receiver_id: receiver,
                content: content.to_string(),
                media_url: media_url.map(str::to_string),
                timestamp: now,
                is_read: false,
            })
        })
    }

    /// The most recent `limit` messages exchanged by `a` and `b`, oldest first.
    pub fn history(&self, a: UserId, b: UserId, limit: usize) -> Result<Vec<MessageRow>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE (sender_id = ?1 AND receiver_id = ?2)
                    OR (sender_id = ?2 AND receiver_id = ?1)
                 ORDER BY id DESC LIMIT ?3"
            ))?;
            let mut rows = stmt.query(rusqlite::params![a.get(), b.get(), limit])?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                out.push(row_to_message(row)?);
            }
            out.reverse();
            Ok(out)
        })
    }

    /// The latest message exchanged by `a` and `b`.
    pub fn last_between(&self, a: UserId, b: UserId) -> Result<Option<MessageRow>> {
        Ok(self.history(a, b, 1)?.pop())
    }

    /// Mark every unread message from `sender` to `receiver` as read.
    /// Returns how many rows changed.
    pub fn mark_read(&self, sender: UserId, receiver: UserId) -> Result<usize> {
        self.db.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE messages SET is_read = 1
                 WHERE sender_id = ?1 AND receiver_id = ?2 AND is_read = 0",
                [sender.get(), receiver.get()],
            )?)
        })
    }
}
