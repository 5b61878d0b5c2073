//! Data models for account storage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_auth_core::Role;

/// Plan assigned to accounts the checkout collaborator has not touched
pub const DEFAULT_PLAN: &str = "free";

/// Unique user identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

/// Opaque session identifier, also the bearer token carried in the cookie
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

/// Unique order identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub u64);

/// A user account
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    /// Always stored lowercase
    pub email: String,
    pub password_hash: String,
    pub name: Option<String>,
    pub role: Role,
    pub plan: String,
    pub stripe_customer_id: Option<String>,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn profile(&self) -> PublicUser {
        PublicUser::from(self)
    }
}

/// Fields supplied when creating an account
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: Option<String>,
    pub role: Role,
}

/// The profile shape returned to clients. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub plan: String,
    pub stripe_customer_id: Option<String>,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            plan: user.plan.clone(),
            stripe_customer_id: user.stripe_customer_id.clone(),
            email_verified: user.email_verified,
            created_at: user.created_at,
        }
    }
}

/// A user session
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Valid iff the expiry is strictly in the future
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// A password reset grant. Never deleted; `used` keeps the audit trail.
#[derive(Debug, Clone)]
pub struct ResetToken {
    pub token: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl ResetToken {
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        !self.used && self.expires_at > now
    }
}

/// An email ownership proof. Consumed by deletion.
#[derive(Debug, Clone)]
pub struct VerificationToken {
    pub token: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A purchase record written by the checkout collaborator.
///
/// Orders outlive the account that placed them; deleting the account strips
/// the identifying columns instead of removing the row.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub user_id: Option<UserId>,
    pub email: Option<String>,
    pub stripe_customer_id: Option<String>,
    pub amount_cents: i64,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when recording an order
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Option<UserId>,
    pub email: Option<String>,
    pub stripe_customer_id: Option<String>,
    pub amount_cents: i64,
}
