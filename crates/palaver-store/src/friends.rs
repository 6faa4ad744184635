//! Symmetric friendships.

use chrono::Utc;
use palaver_core::UserId;
use rusqlite::OptionalExtension;
use tracing::instrument;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::row_helpers::{escape_like, format_timestamp};
use crate::users::{UserRow, row_to_user};

/// Repository for the `friendships` table.
///
/// Each friendship is stored in both directions so lookups never need an
/// `OR`.
pub struct FriendRepo {
    db: Database,
}

impl FriendRepo {
    /// Repository over `db`.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Record a friendship. Returns `false` if it already existed.
    #[instrument(skip(self), fields(a = %a, b = %b))]
    pub fn add(&self, a: UserId, b: UserId) -> Result<bool> {
        if a == b {
            return Err(StoreError::Conflict("a user cannot befriend themselves".into()));
        }
        let now = format_timestamp(Utc::now());

        self.db.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let mut inserted = 0;
            for (user, friend) in [(a, b), (b, a)] {
                inserted += tx.execute(
                    "INSERT OR IGNORE INTO friendships (user_id, friend_id, created_at)
                     VALUES (?1, ?2, ?3)",
                    rusqlite::params![user.get(), friend.get(), now],
                )?;
            }
            tx.commit()?;
            Ok(inserted > 0)
        })
    }

    /// Whether `a` and `b` are friends.
    pub fn are_friends(&self, a: UserId, b: UserId) -> Result<bool> {
        self.db.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM friendships WHERE user_id = ?1 AND friend_id = ?2",
                    [a.get(), b.get()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// All friends of `user`, ordered by username.
    pub fn list(&self, user: UserId) -> Result<Vec<UserRow>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.username, u.display_name, u.created_at
                 FROM friendships f JOIN users u ON u.id = f.friend_id
                 WHERE f.user_id = ?1
                 ORDER BY u.username",
            )?;
            let mut rows = stmt.query([user.get()])?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                out.push(row_to_user(row)?);
            }
            Ok(out)
        })
    }

    /// Friends of `user` whose username or display name contains `query`,
    /// ignoring ASCII case.
    pub fn search(&self, user: UserId, query: &str) -> Result<Vec<UserRow>> {
        let pattern = format!("%{}%", escape_like(&query.trim().to_lowercase()));
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.username, u.display_name, u.created_at
                 FROM friendships f JOIN users u ON u.id = f.friend_id
                 WHERE f.user_id = ?1
                   AND (lower(u.username) LIKE ?2 ESCAPE '\\'
                        OR lower(COALESCE(u.display_name, '')) LIKE ?2 ESCAPE '\\')
                 ORDER BY u.username",
            )?;
            let mut rows = stmt.query(rusqlite::params![user.get(), pattern])?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                out.push(row_to_user(row)?);
            }
            Ok(out)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::UserRepo;

    fn setup() -> (UserRepo, FriendRepo) {
        let db = Database::in_memory().unwrap();
        (UserRepo::new(db.clone()), FriendRepo::new(db))
    }

    #[test]
    fn friendship_is_symmetric() {
        let (users, friends) = setup();
        let a = users.create("ana", None).unwrap().id;
        let b = users.create("bob", None).unwrap().id;

        assert!(friends.add(a, b).unwrap());
        assert!(friends.are_friends(a, b).unwrap());
        assert!(friends.are_friends(b, a).unwrap());
    }

    #[test]
    fn adding_twice_reports_existing() {
        let (users, friends) = setup();
        let a = users.create("ana", None).unwrap().id;
        let b = users.create("bob", None).unwrap().id;

        assert!(friends.add(a, b).unwrap());
        assert!(!friends.add(b, a).unwrap());
        assert_eq!(friends.list(a).unwrap().len(), 1);
    }

    #[test]
    fn self_friendship_rejected() {
        let (users, friends) = setup();
        let a = users.create("ana", None).unwrap().id;
        assert!(matches!(friends.add(a, a), Err(StoreError::Conflict(_))));
    }

    #[test]
    fn unknown_user_violates_foreign_key() {
        let (users, friends) = setup();
        let a = users.create("ana", None).unwrap().id;
        assert!(matches!(
            friends.add(a, UserId::new(9999)),
            Err(StoreError::Conflict(_))
        ));
    }

    #[test]
    fn list_and_search() {
        let (users, friends) = setup();
        let me = users.create("me", None).unwrap().id;
        let carol = users.create("carol", Some("Carol Danvers")).unwrap().id;
        let bob = users.create("bob", None).unwrap().id;
        let stranger = users.create("dave", None).unwrap().id;
        let _ = friends.add(me, carol).unwrap();
        let _ = friends.add(me, bob).unwrap();

        let names: Vec<String> = friends.list(me).unwrap().into_iter().map(|u| u.username).collect();
        assert_eq!(names, vec!["bob", "carol"]);

        let hits = friends.search(me, "DANV").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, carol);

        assert!(friends.search(me, "dave").unwrap().is_empty());
        assert!(!friends.are_friends(me, stranger).unwrap());
    }

    #[test]
    fn search_escapes_wildcards() {
        let (users, friends) = setup();
        let me = users.create("me", None).unwrap().id;
        let odd = users.create("a_b", None).unwrap().id;
        let plain = users.create("axb", None).unwrap().id;
        let _ = friends.add(me, odd).unwrap();
        let _ = friends.add(me, plain).unwrap();

        let hits = friends.search(me, "a_b").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, odd);
    }
}
