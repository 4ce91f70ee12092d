//! Session cookie authentication.
//!
//! Every protected handler takes an [`Authenticated`] argument. Extracting
//! it reads the `bazaar_session` cookie and resolves it through the session
//! store, which also records the user's last activity.
//!
//! ```text
//! Cookie: bazaar_session=<32 hex>
//!        │
//!        ├── no cookie                ──► 401 NO_SUCH_SESSION
//!        ├── unknown / expired id     ──► 401 NO_SUCH_SESSION
//!        └── live session             ──► Identity { user_id, role }
//!                                           │
//!                                  handler: identity.require(Capability)
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use bazaar_core::{CoreError, Id, Identity, Role, Timestamp};
use cookie::time::Duration;

use crate::error::ApiError;
use crate::state::AppState;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "bazaar_session";

/// The caller behind a live session.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated(pub Identity);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let session_id = session_id(&jar).ok_or(CoreError::NoSuchSession)?;
        let identity = state
            .db
            .sessions()
            .resolve(&session_id, Timestamp::now())
            .await?;
        Ok(Authenticated(identity))
    }
}

impl Authenticated {
    /// Sellers may only touch their own data; admins may touch anyone's.
    pub fn require_self_or_admin(&self, owner: Id) -> Result<(), CoreError> {
        let Authenticated(identity) = self;
        if identity.role == Role::Admin || identity.user_id == owner {
            Ok(())
        } else {
            Err(CoreError::NotOwnData {
                caller: identity.user_id,
                owner,
            })
        }
    }
}

/// The session id carried by the request, if any.
pub fn session_id(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Cookie that stores `session_id` for `max_age_secs`.
pub fn session_cookie(session_id: String, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .max_age(Duration::seconds(max_age_secs))
        .secure(secure)
        .build()
}

/// Removal cookie for the session cookie (empty value, `Max-Age=0`).
pub fn clear_session_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    cookie.make_removal();
    cookie
}
