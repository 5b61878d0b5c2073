//! Signup, login and logout

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use storefront_auth_core::{
    generate_token, hash_password, validate_strength, verify_password, Role,
};
use tower_cookies::Cookies;

use super::session::{clear_session_cookie, session_id_from_cookies, set_session_cookie};
use super::{non_empty, normalize_email, run_blocking, JsonBody, OkResponse, UserResponse};
use crate::email::EmailSender;
use crate::error::AuthError;
use crate::notify;
use crate::state::AppState;
use crate::store::{AuthStore, NewUser, User, UserId};

#[derive(Deserialize)]
pub struct SignupRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

/// POST /signup
pub async fn signup<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    cookies: Cookies,
    JsonBody(req): JsonBody<SignupRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AuthError>
where
    S: AuthStore + 'static,
    E: EmailSender + 'static,
{
    let (Some(email), Some(password)) = (non_empty(req.email), non_empty(req.password)) else {
        return Err(AuthError::bad_request("email and password are required"));
    };
    let email = normalize_email(&email);
    if !email.contains('@') {
        return Err(AuthError::bad_request("invalid email address"));
    }
    validate_strength(&password)?;

    // Fast path only; the store's unique constraint is what actually decides a race
    if state.store.get_user_by_email(&email)?.is_some() {
        return Err(AuthError::email_taken());
    }

    let cost = state.settings.bcrypt_cost;
    let password_hash = run_blocking(move || hash_password(&password, cost)).await??;

    // Bootstrap admins are promoted only once they verify the address
    let user = state.store.create_user(NewUser {
        email,
        password_hash,
        name: non_empty(req.name),
        role: Role::User,
    })?;

    let session = state
        .store
        .create_session(user.id, Utc::now() + state.settings.session_ttl)?;
    set_session_cookie(&cookies, &session.id, &state.settings);

    tracing::info!(user_id = user.id.0, role = %user.role, "Account created");

    let email = user.email.clone();
    let name = user.name.clone();
    notify::dispatch(&state.email_sender, "welcome", move |sender| {
        sender.send_welcome(&email, name.as_deref())
    });
    if let Err(e) = issue_verification(&state, user.id, &user.email) {
        tracing::warn!(user_id = user.id.0, error = %e, "Could not create verification token");
    }

    Ok((StatusCode::CREATED, Json(UserResponse { user: user.profile() })))
}

/// Create a verification token for the account and mail the link.
///
/// Only token creation can fail; the email itself is detached.
pub(crate) fn issue_verification<S, E>(
    state: &AppState<S, E>,
    user_id: UserId,
    email: &str,
) -> Result<(), AuthError>
where
    S: AuthStore + 'static,
    E: EmailSender + 'static,
{
    let token = generate_token();
    let expires_at = Utc::now() + state.settings.verification_token_ttl;
    state
        .store
        .create_verification_token(user_id, &token, expires_at)?;

    let email = email.to_string();
    let link = state.settings.verification_link(&token);
    notify::dispatch(&state.email_sender, "verification", move |sender| {
        sender.send_verification(&email, &link)
    });

    Ok(())
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// POST /login
pub async fn login<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    cookies: Cookies,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<UserResponse>, AuthError>
where
    S: AuthStore + 'static,
    E: EmailSender + 'static,
{
    let (Some(email), Some(password)) = (non_empty(req.email), non_empty(req.password)) else {
        return Err(AuthError::bad_request("email and password are required"));
    };

    let user = state.store.get_user_by_email(&normalize_email(&email))?;
    let decoy = state.login_decoy.clone();
    let user = run_blocking(move || authenticate(user, &password, &decoy, verify_password))
        .await?
        .ok_or_else(AuthError::invalid_credentials)?;

    let session = state
        .store
        .create_session(user.id, Utc::now() + state.settings.session_ttl)?;
    set_session_cookie(&cookies, &session.id, &state.settings);

    tracing::debug!(user_id = user.id.0, "Login succeeded");

    Ok(Json(UserResponse { user: user.profile() }))
}

/// Check `password` against the account, or against `decoy` when there is no
/// account. Either way exactly one verification runs.
fn authenticate<V>(user: Option<User>, password: &str, decoy: &str, verify: V) -> Option<User>
where
    V: Fn(&str, &str) -> bool,
{
    match user {
        Some(user) => verify(password, &user.password_hash).then_some(user),
        None => {
            verify(password, decoy);
            None
        }
    }
}

/// POST /logout
pub async fn logout<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    cookies: Cookies,
) -> Json<OkResponse>
where
    S: AuthStore + 'static,
    E: EmailSender + 'static,
{
    if let Some(session_id) = session_id_from_cookies(&cookies) {
        if let Err(e) = state.store.delete_session(&session_id) {
            tracing::warn!(error = %e, "Could not delete session on logout");
        }
    }

    clear_session_cookie(&cookies, &state.settings);

    Json(OkResponse::ok())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use chrono::Utc;
    use storefront_auth_core::Role;

    use super::*;
    use crate::store::DEFAULT_PLAN;

    fn account(hash: &str) -> User {
        User {
            id: UserId(1),
            email: "known@example.com".to_string(),
            password_hash: hash.to_string(),
            name: None,
            role: Role::User,
            plan: DEFAULT_PLAN.to_string(),
            stripe_customer_id: None,
            email_verified: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_unknown_account_still_runs_one_verification() {
        let checked = RefCell::new(Vec::new());
        let verify = |_: &str, hash: &str| {
            checked.borrow_mut().push(hash.to_string());
            true
        };

        assert!(authenticate(None, "password123", "decoy-hash", verify).is_none());
        assert_eq!(*checked.borrow(), vec!["decoy-hash".to_string()]);
    }

    #[test]
    fn test_known_account_runs_one_verification() {
        let checked = RefCell::new(Vec::new());
        let verify = |_: &str, hash: &str| {
            checked.borrow_mut().push(hash.to_string());
            false
        };

        assert!(authenticate(Some(account("real-hash")), "wrong", "decoy-hash", verify).is_none());
        assert_eq!(*checked.borrow(), vec!["real-hash".to_string()]);
    }

    #[test]
    fn test_matching_password_returns_account() {
        let user = authenticate(Some(account("real-hash")), "right", "decoy-hash", |_, _| true);
        assert_eq!(user.map(|u| u.id), Some(UserId(1)));
    }
}
