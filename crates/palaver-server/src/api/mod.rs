//! Authenticated JSON API under `/api`.
//!
//! Every route takes an [`AuthUser`](crate::auth::AuthUser); store work runs
//! on the blocking pool through [`SqliteGateway::run`](palaver_store::SqliteGateway::run).

pub mod error;
pub mod friends;
pub mod messages;
pub mod rooms;

use axum::Router;
use axum::routing::{get, post};
use palaver_core::UserId;

use crate::server::AppState;

pub use error::ApiError;

/// Routes mounted at the root router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/messages/{friend_id}", get(messages::history))
        .route("/api/messages/{friend_id}/read", post(messages::mark_read))
        .route("/api/send-message", post(messages::send))
        .route("/api/friends", get(friends::list))
        .route("/api/chat/room/{friend_id}", get(rooms::room_for))
}

/// Parse a user id taken from a path segment.
fn path_user_id(raw: &str) -> Option<UserId> {
    raw.trim().parse().ok()
}

fn friend_not_found() -> ApiError {
    ApiError::NotFound("Friend not found".into())
}
