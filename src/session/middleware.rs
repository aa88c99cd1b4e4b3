use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::{debug, instrument, warn};

use super::types::CurrentUser;
use crate::shared::AppState;

/// Name of the cookie holding the signed session token
pub const SESSION_COOKIE: &str = "forum_session";

/// Session middleware - validates the session cookie and adds CurrentUser to the request.
/// Usage: .layer(middleware::from_fn_with_state(app_state.clone(), session::load_session))
/// A missing or invalid cookie leaves the request anonymous; it never fails the request.
#[instrument(skip_all, fields(path = %req.uri().path()))]
pub async fn load_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        match state.session_service.validate_session(cookie.value()).await {
            Ok(claims) => match state.user_repository.get_user(claims.user_id).await {
                Ok(Some(user)) => {
                    debug!(user_id = %user.id, username = %user.username, "Request authenticated");
                    req.extensions_mut().insert(CurrentUser {
                        id: user.id,
                        username: user.username,
                        session_id: claims.session_id,
                    });
                }
                Ok(None) => warn!(user_id = %claims.user_id, "Session refers to a missing user"),
                Err(e) => warn!(error = %e, "Failed to load session user"),
            },
            Err(e) => debug!(error = %e, "Ignoring invalid session cookie"),
        }
    }

    next.run(req).await
}

/// Handlers that take `CurrentUser` require a login; anonymous visitors are
/// sent to the login page and brought back afterwards.
#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| {
                debug!(path = %parts.uri.path(), "Anonymous request to protected route");
                Redirect::to(&format!("/login/?next={}", parts.uri.path()))
            })
    }
}

/// Cookie carrying a freshly issued session token
pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Cookie that removes the session cookie when added to a jar via `remove`
pub fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}
