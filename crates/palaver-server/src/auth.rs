//! Request credentials and the authenticated-user extractor.

use axum::extract::{FromRequestParts, Query};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, Uri};
use palaver_core::{Credentials, Identity};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Credentials carried by a request: `Authorization: Bearer <token>` first,
/// then a `?token=` query parameter (browsers cannot set headers on a
/// WebSocket handshake).
pub fn credentials_from(headers: &HeaderMap, uri: &Uri) -> Credentials {
    if let Some(token) = bearer_token(headers) {
        return Credentials::bearer(token);
    }
    let query = Query::<TokenQuery>::try_from_uri(uri)
        .map(|Query(q)| q)
        .unwrap_or_default();
    match query.token.map(|t| t.trim().to_owned()) {
        Some(token) if !token.is_empty() => Credentials::bearer(token),
        _ => Credentials::anonymous(),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_owned())
}

/// The caller of an `/api` route. Rejects with 401 when the request carries
/// no valid token.
#[derive(Clone, Debug)]
pub struct AuthUser(pub Identity);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let credentials = credentials_from(&parts.headers, &parts.uri);
        state
            .chat
            .authenticator
            .current_authenticated_user(&credentials)
            .await
            .map(AuthUser)
            .ok_or(ApiError::Unauthorized)
    }
}
