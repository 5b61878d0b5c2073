//! Account deletion

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use storefront_auth_core::verify_password;
use tower_cookies::Cookies;

use super::session::clear_session_cookie;
use super::{non_empty, run_blocking, JsonBody, OkResponse};
use crate::email::EmailSender;
use crate::error::AuthError;
use crate::identity::RequireUser;
use crate::state::AppState;
use crate::store::AuthStore;

#[derive(Deserialize)]
pub struct DeleteAccountRequest {
    pub password: Option<String>,
}

/// DELETE /account
///
/// Irreversible. Orders survive with the owner's identity stripped.
pub async fn delete_account<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    cookies: Cookies,
    RequireUser(caller): RequireUser,
    JsonBody(req): JsonBody<DeleteAccountRequest>,
) -> Result<Json<OkResponse>, AuthError>
where
    S: AuthStore + 'static,
    E: EmailSender + 'static,
{
    let Some(password) = non_empty(req.password) else {
        return Err(AuthError::bad_request("password is required"));
    };

    // A valid session is not enough; deletion needs the current password
    let user = state
        .store
        .get_user(caller.id)?
        .ok_or_else(AuthError::authentication_required)?;
    let hash = user.password_hash.clone();
    if !run_blocking(move || verify_password(&password, &hash)).await? {
        return Err(AuthError::Unauthorized("incorrect password".to_string()));
    }

    let detached = state.store.delete_account(user.id)?;

    clear_session_cookie(&cookies, &state.settings);

    tracing::info!(user_id = user.id.0, detached_orders = detached, "Account deleted");

    Ok(Json(OkResponse::ok()))
}
