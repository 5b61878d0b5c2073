//! Service error types

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("admin access required")]
    Forbidden,

    #[error("{0}")]
    Conflict(String),

    #[error("not found")]
    NotFound,

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        AuthError::BadRequest(msg.into())
    }

    /// Generic login failure. Identical whether the account exists or not.
    pub fn invalid_credentials() -> Self {
        AuthError::Unauthorized("invalid email or password".to_string())
    }

    pub fn authentication_required() -> Self {
        AuthError::Unauthorized("authentication required".to_string())
    }

    pub fn email_taken() -> Self {
        AuthError::Conflict("an account with this email already exists".to_string())
    }
}

impl From<storefront_auth_core::Error> for AuthError {
    fn from(err: storefront_auth_core::Error) -> Self {
        use storefront_auth_core::Error;
        match err {
            Error::PasswordTooShort { .. } => AuthError::BadRequest("password too short".to_string()),
            Error::PasswordTooLong { .. } => AuthError::BadRequest("password too long".to_string()),
            Error::InvalidRole(_) => AuthError::BadRequest(err.to_string()),
            Error::Hash(e) => AuthError::Internal(e.to_string()),
        }
    }
}

impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        AuthError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AuthError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AuthError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.as_str()),
            AuthError::Forbidden => (StatusCode::FORBIDDEN, "admin access required"),
            AuthError::Conflict(msg) => (StatusCode::CONFLICT, msg.as_str()),
            AuthError::NotFound => (StatusCode::NOT_FOUND, "not found"),
            AuthError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        };

        let body = json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}
