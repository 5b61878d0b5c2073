//! Password recovery endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use storefront_auth_core::{generate_token, hash_password, validate_strength};

use super::{non_empty, normalize_email, run_blocking, JsonBody, OkResponse};
use crate::email::EmailSender;
use crate::error::AuthError;
use crate::notify;
use crate::state::AppState;
use crate::store::AuthStore;

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

/// POST /forgot-password
///
/// Answers `{ok: true}` whether or not the address belongs to an account.
pub async fn forgot_password<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    JsonBody(req): JsonBody<ForgotPasswordRequest>,
) -> Result<Json<OkResponse>, AuthError>
where
    S: AuthStore + 'static,
    E: EmailSender + 'static,
{
    let Some(email) = non_empty(req.email) else {
        return Err(AuthError::bad_request("email is required"));
    };

    if let Err(e) = start_reset(&state, &normalize_email(&email)) {
        tracing::warn!(error = %e, "Password reset request failed");
    }

    Ok(Json(OkResponse::ok()))
}

fn start_reset<S, E>(state: &AppState<S, E>, email: &str) -> Result<(), AuthError>
where
    S: AuthStore + 'static,
    E: EmailSender + 'static,
{
    let Some(user) = state.store.get_user_by_email(email)? else {
        tracing::debug!("Password reset requested for unknown address");
        return Ok(());
    };

    let token = generate_token();
    let expires_at = Utc::now() + state.settings.reset_token_ttl;
    state.store.create_reset_token(user.id, &token, expires_at)?;

    tracing::info!(user_id = user.id.0, "Password reset token issued");

    let link = state.settings.reset_link(&token);
    notify::dispatch(&state.email_sender, "password_reset", move |sender| {
        sender.send_password_reset(&user.email, &link)
    });

    Ok(())
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: Option<String>,
    pub password: Option<String>,
}

/// POST /reset-password
pub async fn reset_password<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    JsonBody(req): JsonBody<ResetPasswordRequest>,
) -> Result<Json<OkResponse>, AuthError>
where
    S: AuthStore + 'static,
    E: EmailSender + 'static,
{
    let (Some(token), Some(password)) = (non_empty(req.token), non_empty(req.password)) else {
        return Err(AuthError::bad_request("token and password are required"));
    };
    validate_strength(&password)?;

    // Hash before consuming so a hashing failure does not burn the token
    let cost = state.settings.bcrypt_cost;
    let password_hash = run_blocking(move || hash_password(&password, cost)).await??;

    let user_id = state
        .store
        .consume_reset_token(&token, Utc::now())?
        .ok_or_else(|| AuthError::bad_request("invalid or expired token"))?;

    state.store.update_password(user_id, &password_hash)?;
    let revoked = state.store.delete_user_sessions(user_id)?;

    tracing::info!(user_id = user_id.0, revoked, "Password reset completed");

    Ok(Json(OkResponse::ok()))
}
