//! Session cookie handling and the identity probe

use axum::Json;
use tower_cookies::cookie::time::Duration as CookieDuration;
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies};

use super::UserResponse;
use crate::config::AuthSettings;
use crate::identity::RequireUser;
use crate::store::SessionId;

pub const SESSION_COOKIE: &str = "session";

/// GET /me
pub async fn me(RequireUser(user): RequireUser) -> Json<UserResponse> {
    Json(UserResponse { user })
}

/// Helper to read the session id carried by the request, if any
pub fn session_id_from_cookies(cookies: &Cookies) -> Option<SessionId> {
    cookies
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .map(SessionId)
}

/// Helper to set session cookie, with a max-age matching the server-side expiry
pub fn set_session_cookie(cookies: &Cookies, session_id: &SessionId, settings: &AuthSettings) {
    let cookie = Cookie::build((SESSION_COOKIE, session_id.0.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(settings.cookie_secure)
        .max_age(CookieDuration::seconds(settings.session_ttl.num_seconds()))
        .build();
    cookies.add(cookie);
}

/// Helper to clear session cookie
pub fn clear_session_cookie(cookies: &Cookies, settings: &AuthSettings) {
    let cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(settings.cookie_secure)
        .max_age(CookieDuration::ZERO)
        .build();
    cookies.add(cookie);
}
