//! # palaver-store
//!
//! SQLite persistence for Palaver: users, symmetric friendships, chat
//! messages and bearer tokens, plus [`SqliteGateway`], which implements the
//! chat core's collaborator traits on top of them.
//!
//! The connection lives behind a `parking_lot::Mutex` in [`Database`];
//! repositories are thin synchronous wrappers and all async access goes
//! through [`SqliteGateway::run`].

#![deny(unsafe_code)]

pub mod database;
pub mod error;
pub mod friends;
pub mod gateway;
pub mod messages;
pub mod migrations;
pub mod row_helpers;
pub mod tokens;
pub mod users;

pub use database::Database;
pub use error::{Result, StoreError};
pub use friends::FriendRepo;
pub use gateway::SqliteGateway;
pub use messages::{MessageRepo, MessageRow};
pub use tokens::{IssuedToken, TokenRepo, hash_token};
pub use users::{UserRepo, UserRow};
