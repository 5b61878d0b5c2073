//! Administrator-only user management

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use storefront_auth_core::Role;

use super::{JsonBody, UserResponse};
use crate::email::EmailSender;
use crate::error::AuthError;
use crate::identity::RequireAdmin;
use crate::state::AppState;
use crate::store::{AuthStore, PublicUser, UserId};

#[derive(Serialize, Deserialize)]
pub struct UsersResponse {
    pub users: Vec<PublicUser>,
}

/// GET /admin/users
pub async fn list_users<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<UsersResponse>, AuthError>
where
    S: AuthStore + 'static,
    E: EmailSender + 'static,
{
    let users = state
        .store
        .list_users()?
        .iter()
        .map(PublicUser::from)
        .collect();

    Ok(Json(UsersResponse { users }))
}

#[derive(Deserialize)]
pub struct SetRoleRequest {
    pub role: Option<String>,
}

/// PUT /admin/users/{id}/role
pub async fn set_role<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<SetRoleRequest>,
) -> Result<Json<UserResponse>, AuthError>
where
    S: AuthStore + 'static,
    E: EmailSender + 'static,
{
    let user_id = id
        .parse()
        .map(UserId)
        .map_err(|_| AuthError::bad_request("invalid user id"))?;
    let role: Role = req
        .role
        .ok_or_else(|| AuthError::bad_request("role is required"))?
        .parse()?;

    if state.store.get_user(user_id)?.is_none() {
        return Err(AuthError::NotFound);
    }
    state.store.set_role(user_id, role)?;

    let user = state.store.get_user(user_id)?.ok_or(AuthError::NotFound)?;

    tracing::info!(admin_id = admin.id.0, user_id = user_id.0, role = %role, "Role changed");

    Ok(Json(UserResponse { user: user.profile() }))
}
