//! Session cookie and caller identity helpers

use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::models::UploadSession;
use crate::AppState;

pub const SESSION_COOKIE: &str = "rmap_session";
/// Acting admin email
pub const USER_HEADER: &str = "x-rmap-user";
/// Organisational user id, for `managed_by` checks
pub const USER_ID_HEADER: &str = "x-rmap-user-id";

/// Session id from the `rmap_session` cookie, if present and well-formed
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

/// Acting admin email, falling back to the configured owner
pub fn acting_user(headers: &HeaderMap, state: &AppState) -> String {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| state.config.owner_email.clone())
}

/// Organisational user id, when the caller is one
pub fn org_user_id(headers: &HeaderMap) -> Option<i64> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// The caller's session, or a fresh one when the cookie is missing or stale
///
/// Returns a copy; write it back with `store_session` when done.
pub async fn load_session(state: &AppState, headers: &HeaderMap) -> (UploadSession, bool) {
    if let Some(id) = session_id_from_headers(headers) {
        if let Some(session) = state.sessions.read().await.get(&id) {
            return (session.clone(), false);
        }
    }
    (UploadSession::new(), true)
}

pub async fn store_session(state: &AppState, session: UploadSession) {
    state
        .sessions
        .write()
        .await
        .insert(session.session_id, session);
}

/// Attach `Set-Cookie` for newly created sessions
pub fn with_session_cookie(response: impl IntoResponse, session_id: Uuid, is_new: bool) -> Response {
    let mut response = response.into_response();
    if is_new {
        let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, session_id);
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}
