//! HTTP routes for the auth service

mod account;
mod admin;
mod auth;
mod reset;
pub(crate) mod session;
mod verification;

use std::sync::Arc;

use axum::extract::FromRequest;
use axum::middleware;
use axum::routing::{delete, get, post, put};
use axum::Router;
use serde::{Deserialize, Serialize};
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;

pub use admin::UsersResponse;
pub use session::SESSION_COOKIE;

use crate::email::EmailSender;
use crate::error::AuthError;
use crate::identity;
use crate::state::AppState;
use crate::store::{AuthStore, PublicUser};

/// JSON body extractor whose rejections use the service's error shape
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AuthError))]
pub struct JsonBody<T>(pub T);

#[derive(Debug, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub user: PublicUser,
}

/// Treat absent and blank fields alike
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Canonical form of a submitted email. Case is folded by the store.
fn normalize_email(email: &str) -> String {
    email.trim().to_string()
}

/// Run bcrypt work on the blocking pool instead of an async worker
async fn run_blocking<T, F>(job: F) -> Result<T, AuthError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| AuthError::Internal(format!("blocking task failed: {e}")))
}

/// Create the router with all routes
pub fn create_router<S, E>(state: Arc<AppState<S, E>>) -> Router
where
    S: AuthStore + 'static,
    E: EmailSender + 'static,
{
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(session::me))
        .route("/forgot-password", post(reset::forgot_password))
        .route("/reset-password", post(reset::reset_password))
        .route("/send-verification", post(verification::send_verification))
        .route("/verify-email", post(verification::verify_email))
        .route("/account", delete(account::delete_account))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/{id}/role", put(admin::set_role))
        // Identity resolution needs the cookie jar, so it sits inside the cookie layer
        .layer(middleware::from_fn_with_state(
            state.clone(),
            identity::resolve_identity::<S, E>,
        ))
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
