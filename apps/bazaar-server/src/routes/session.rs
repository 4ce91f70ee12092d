//! Login and logout.

use axum::{
    extract::{FromRequest, Request, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Form, Json,
};
use axum_extra::extract::cookie::CookieJar;
use bazaar_core::validation::parse_id;
use bazaar_core::{CoreError, Id, Role};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::{clear_session_cookie, session_cookie, session_id};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Credentials, as JSON or as an HTML form. `username` is the user id.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user_id: Id,
    pub role: Role,
}

/// `POST /login`: opens a session and sets the session cookie.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
) -> ApiResult<impl IntoResponse> {
    let credentials = read_credentials(request, &state).await?;
    let user_id = parse_id("username", &credentials.username)?;

    let ttl = state.config.session_ttl_secs;
    let (session_id, role) = state
        .db
        .sessions()
        .login(user_id, &credentials.password, ttl)
        .await?;

    let cookie = session_cookie(session_id, ttl, state.config.secure_cookies);
    Ok((jar.add(cookie), Json(LoginResponse { user_id, role })))
}

/// `POST /logout`: deletes the session named by the cookie.
///
/// Without a cookie this is `NoSuchSession`. A cookie naming a session that
/// is already gone is accepted.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> ApiResult<impl IntoResponse> {
    let session_id = session_id(&jar).ok_or(CoreError::NoSuchSession)?;
    let existed = state.db.sessions().logout(&session_id).await?;
    debug!(existed, "Logout");

    Ok((StatusCode::NO_CONTENT, jar.add(clear_session_cookie())))
}

async fn read_credentials(request: Request, state: &AppState) -> ApiResult<LoginRequest> {
    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));

    if is_json {
        let Json(credentials) = Json::<LoginRequest>::from_request(request, state).await?;
        Ok(credentials)
    } else {
        let Form(credentials) = Form::<LoginRequest>::from_request(request, state)
            .await
            .map_err(|rejection| ApiError::invalid_input(rejection.body_text()))?;
        Ok(credentials)
    }
}
