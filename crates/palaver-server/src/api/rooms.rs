//! Room lookup for a friend pair.

use axum::Json;
use axum::extract::{Path, State};
use palaver_core::{RoomName, canonical_room_name};
use palaver_store::{FriendRepo, UserRepo};
use serde::Serialize;
use tracing::instrument;

use super::{ApiError, friend_not_found, path_user_id};
use crate::auth::AuthUser;
use crate::server::AppState;

/// `GET /api/chat/room/{friend_id}` body.
#[derive(Debug, Serialize)]
pub struct RoomResponse {
    /// Canonical room name to connect to at `/ws/chat/{room_name}`.
    pub room_name: RoomName,
}

/// `GET /api/chat/room/{friend_id}`
#[instrument(skip_all, fields(user_id = %me.user_id, friend_id = %friend_id))]
pub async fn room_for(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
    Path(friend_id): Path<String>,
) -> Result<Json<RoomResponse>, ApiError> {
    let friend = path_user_id(&friend_id).ok_or_else(friend_not_found)?;
    let caller = me.user_id;

    let (exists, friends) = state
        .store
        .run(move |db| {
            if !UserRepo::new(db.clone()).exists(friend)? {
                return Ok((false, false));
            }
            Ok((true, FriendRepo::new(db.clone()).are_friends(caller, friend)?))
        })
        .await?;

    if !exists {
        return Err(friend_not_found());
    }
    if !friends {
        return Err(ApiError::Forbidden("You can only chat with friends".into()));
    }
    Ok(Json(RoomResponse {
        room_name: canonical_room_name(caller, friend),
    }))
}
