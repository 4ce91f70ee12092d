//! User routes. Listings are for administrators; every user may change
//! their own password.

use axum::{extract::State, http::StatusCode, Json};
use bazaar_core::{Capability, Id, User, UserWithItemCount};
use serde::Deserialize;

use crate::auth::Authenticated;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::routes::items::SelectionQuery;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PasswordRequest {
    pub password: String,
}

/// `GET /users?selection=`: every user with the number of items they consigned.
pub async fn list_users(
    Authenticated(identity): Authenticated,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SelectionQuery>,
) -> ApiResult<Json<Vec<UserWithItemCount>>> {
    identity.require(Capability::Administer)?;
    Ok(Json(state.db.users().list_with_item_count(query.selection).await?))
}

/// `GET /users/{id}`
pub async fn get_user(
    Authenticated(identity): Authenticated,
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Id>,
) -> ApiResult<Json<User>> {
    identity.require(Capability::Administer)?;
    Ok(Json(state.db.users().get(user_id).await?))
}

/// `PUT /users/{id}/password`: own password, or anyone's for admins.
pub async fn update_password(
    auth: Authenticated,
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Id>,
    ApiJson(request): ApiJson<PasswordRequest>,
) -> ApiResult<StatusCode> {
    auth.require_self_or_admin(user_id)?;
    state.db.users().update_password(user_id, &request.password).await?;
    Ok(StatusCode::NO_CONTENT)
}
