//! Friend list with last-message previews, and friend search.

use axum::Json;
use axum::extract::{Query, State};
use palaver_core::UserId;
use palaver_store::{FriendRepo, MessageRepo, MessageRow, UserRow};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::ApiError;
use crate::auth::AuthUser;
use crate::server::AppState;

const PREVIEW_CHARS: usize = 50;
const PREVIEW_DATE_FORMAT: &str = "%b %d";

/// `GET /api/friends` query.
#[derive(Debug, Default, Deserialize)]
pub struct FriendsQuery {
    /// Case-insensitive filter on username or display name.
    #[serde(default)]
    pub q: Option<String>,
}

/// Summary of the latest message in a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LastMessagePreview {
    /// First 50 characters, with `...` appended when cut.
    pub content: String,
    /// Short date, e.g. `Jan 05`.
    pub timestamp: String,
    /// Sent by the friend and not yet read.
    pub is_unread: bool,
}

impl LastMessagePreview {
    fn new(row: &MessageRow, viewer: UserId) -> Self {
        Self {
            content: truncate_preview(&row.content),
            timestamp: row.timestamp.format(PREVIEW_DATE_FORMAT).to_string(),
            is_unread: row.sender_id != viewer && !row.is_read,
        }
    }
}

fn truncate_preview(content: &str) -> String {
    match content.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_owned(),
    }
}

/// One friend.
#[derive(Clone, Debug, Serialize)]
pub struct FriendView {
    /// User id.
    pub id: UserId,
    /// Username.
    pub username: String,
    /// Optional display name.
    pub display_name: Option<String>,
    /// Present (possibly `null`) on the unfiltered list only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<Option<LastMessagePreview>>,
}

impl FriendView {
    fn plain(user: UserRow) -> Self {
        Self {
            id: user.id,
            username: user.username,
            display_name: user.display_name,
            last_message: None,
        }
    }
}

/// `GET /api/friends` body.
#[derive(Debug, Serialize)]
pub struct FriendsResponse {
    /// Ordered by username.
    pub friends: Vec<FriendView>,
}

/// `GET /api/friends?q=`
#[instrument(skip_all, fields(user_id = %me.user_id))]
pub async fn list(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<FriendsQuery>,
) -> Result<Json<FriendsResponse>, ApiError> {
    let viewer = me.user_id;
    let search = query.q.filter(|q| !q.trim().is_empty());

    let friends: Vec<FriendView> = state
        .store
        .run(move |db| {
            let repo = FriendRepo::new(db.clone());
            if let Some(q) = search {
                return Ok(repo.search(viewer, &q)?.into_iter().map(FriendView::plain).collect());
            }
            let messages = MessageRepo::new(db.clone());
            repo.list(viewer)?
                .into_iter()
                .map(|user| -> palaver_store::Result<FriendView> {
                    let last = messages.last_between(viewer, user.id)?;
                    let mut view = FriendView::plain(user);
                    view.last_message = Some(last.map(|row| LastMessagePreview::new(&row, viewer)));
                    Ok(view)
                })
                .collect()
        })
        .await?;

    Ok(Json(FriendsResponse { friends }))
}
