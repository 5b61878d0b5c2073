//! Request identity and authorization guards
//!
//! [`resolve_identity`] runs in front of every route. It turns the session
//! cookie into a [`CurrentUser`] stored in the request extensions and never
//! fails the request. Handlers then ask for the tier they need with the
//! [`RequireUser`] or [`RequireAdmin`] extractors.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use tower_cookies::Cookies;

use crate::email::EmailSender;
use crate::error::AuthError;
use crate::routes::session::session_id_from_cookies;
use crate::state::AppState;
use crate::store::{AuthStore, PublicUser};

/// Identity resolved for the current request; `None` means anonymous
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<PublicUser>);

impl CurrentUser {
    fn from_parts(parts: &Parts) -> Self {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .unwrap_or_default()
    }
}

/// Middleware resolving the session cookie to a user.
///
/// Read-only: expiry is never extended, and a failed lookup is logged and
/// treated as anonymous.
pub async fn resolve_identity<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    cookies: Cookies,
    mut request: Request,
    next: Next,
) -> Response
where
    S: AuthStore + 'static,
    E: EmailSender + 'static,
{
    let identity = match session_id_from_cookies(&cookies) {
        Some(session_id) => match state.store.find_session_user(&session_id, Utc::now()) {
            Ok(user) => user.as_ref().map(PublicUser::from),
            Err(e) => {
                tracing::warn!(error = %e, "Session lookup failed, continuing anonymously");
                None
            }
        },
        None => None,
    };

    request.extensions_mut().insert(CurrentUser(identity));
    next.run(request).await
}

/// Reject anonymous callers
pub fn require_authenticated(current: &CurrentUser) -> Result<&PublicUser, AuthError> {
    current
        .0
        .as_ref()
        .ok_or_else(AuthError::authentication_required)
}

/// Reject anyone who is not an administrator, anonymous callers included
pub fn require_admin(current: &CurrentUser) -> Result<&PublicUser, AuthError> {
    match &current.0 {
        Some(user) if user.role.is_admin() => Ok(user),
        _ => Err(AuthError::Forbidden),
    }
}

impl<St> FromRequestParts<St> for CurrentUser
where
    St: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        Ok(CurrentUser::from_parts(parts))
    }
}

/// Extractor for routes that need a signed-in user
#[derive(Debug, Clone)]
pub struct RequireUser(pub PublicUser);

impl<St> FromRequestParts<St> for RequireUser
where
    St: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        let current = CurrentUser::from_parts(parts);
        require_authenticated(&current).cloned().map(RequireUser)
    }
}

/// Extractor for routes restricted to administrators
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub PublicUser);

impl<St> FromRequestParts<St> for RequireAdmin
where
    St: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        let current = CurrentUser::from_parts(parts);
        require_admin(&current).cloned().map(RequireAdmin)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use storefront_auth_core::Role;

    use super::*;
    use crate::store::{UserId, DEFAULT_PLAN};

    fn profile(role: Role) -> PublicUser {
        PublicUser {
            id: UserId(7),
            email: "guard@example.com".to_string(),
            name: None,
            role,
            plan: DEFAULT_PLAN.to_string(),
            stripe_customer_id: None,
            email_verified: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_anonymous_is_unauthorized() {
        let current = CurrentUser(None);
        assert!(matches!(
            require_authenticated(&current),
            Err(AuthError::Unauthorized(_))
        ));
        assert!(matches!(require_admin(&current), Err(AuthError::Forbidden)));
    }

    #[test]
    fn test_user_is_authenticated_but_not_admin() {
        let current = CurrentUser(Some(profile(Role::User)));
        assert!(require_authenticated(&current).is_ok());
        assert!(matches!(require_admin(&current), Err(AuthError::Forbidden)));
    }

    #[test]
    fn test_admin_passes_both_guards() {
        let current = CurrentUser(Some(profile(Role::Admin)));
        assert!(require_authenticated(&current).is_ok());
        assert_eq!(require_admin(&current).unwrap().id, UserId(7));
    }

    #[tokio::test]
    async fn test_extractor_without_middleware_is_anonymous() {
        let (mut parts, _) = axum::http::Request::new(()).into_parts();
        let result = RequireUser::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthError::Unauthorized(_))));
    }
}
