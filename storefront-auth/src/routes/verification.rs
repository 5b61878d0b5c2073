//! Email ownership verification

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use storefront_auth_core::Role;

use super::auth::issue_verification;
use super::{non_empty, JsonBody, OkResponse};
use crate::email::EmailSender;
use crate::error::AuthError;
use crate::identity::RequireUser;
use crate::state::AppState;
use crate::store::AuthStore;

/// POST /send-verification
pub async fn send_verification<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    RequireUser(user): RequireUser,
) -> Result<Json<OkResponse>, AuthError>
where
    S: AuthStore + 'static,
    E: EmailSender + 'static,
{
    if user.email_verified {
        return Ok(Json(OkResponse::ok()));
    }

    let dropped = state.store.delete_verification_tokens(user.id)?;
    issue_verification(&state, user.id, &user.email)?;

    tracing::debug!(user_id = user.id.0, dropped, "Verification email re-sent");

    Ok(Json(OkResponse::ok()))
}

#[derive(Deserialize)]
pub struct VerifyEmailRequest {
    pub token: Option<String>,
}

/// POST /verify-email
pub async fn verify_email<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    JsonBody(req): JsonBody<VerifyEmailRequest>,
) -> Result<Json<OkResponse>, AuthError>
where
    S: AuthStore + 'static,
    E: EmailSender + 'static,
{
    let Some(token) = non_empty(req.token) else {
        return Err(AuthError::bad_request("token is required"));
    };

    let user_id = state
        .store
        .consume_verification_token(&token, Utc::now())?
        .ok_or_else(|| AuthError::bad_request("invalid or expired token"))?;

    state.store.mark_email_verified(user_id)?;

    tracing::info!(user_id = user_id.0, "Email verified");

    // A bootstrap admin address gets its role only once ownership is proven
    if let Some(user) = state.store.get_user(user_id)? {
        if !user.role.is_admin() && state.settings.is_admin_email(&user.email) {
            state.store.set_role(user_id, Role::Admin)?;
            tracing::info!(user_id = user_id.0, "Bootstrap admin promoted");
        }
    }

    Ok(Json(OkResponse::ok()))
}
