//! Storage abstractions for accounts, sessions and recovery tokens

pub mod memory;
pub mod models;
pub mod sqlite;

pub use memory::InMemoryStore;
pub use models::*;
pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};
use storefront_auth_core::Role;

use crate::error::AuthError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, AuthError>;

/// Trait for account storage
pub trait UserStore: Send + Sync {
    /// Insert a new account.
    ///
    /// The email is unique case-insensitively; a duplicate yields
    /// `AuthError::Conflict` even when two inserts race.
    fn create_user(&self, new_user: NewUser) -> StoreResult<User>;

    /// Get a user by ID
    fn get_user(&self, user_id: UserId) -> StoreResult<Option<User>>;

    /// Get a user by email address (case-insensitive)
    fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// List all users, oldest first
    fn list_users(&self) -> StoreResult<Vec<User>>;

    /// Replace the stored password hash
    fn update_password(&self, user_id: UserId, password_hash: &str) -> StoreResult<()>;

    /// Change the role of an account
    fn set_role(&self, user_id: UserId, role: Role) -> StoreResult<()>;

    /// Set the email-verified flag (one way)
    fn mark_email_verified(&self, user_id: UserId) -> StoreResult<()>;

    /// Delete a user along with its sessions and tokens
    fn delete_user(&self, user_id: UserId) -> StoreResult<()>;
}

/// Trait for session storage
pub trait SessionStore: Send + Sync {
    /// Create a new session for a user expiring at `expires_at`
    fn create_session(&self, user_id: UserId, expires_at: DateTime<Utc>) -> StoreResult<Session>;

    /// Resolve a session to its owner, ignoring sessions that expired at or before `now`
    fn find_session_user(&self, session_id: &SessionId, now: DateTime<Utc>)
        -> StoreResult<Option<User>>;

    /// Delete a session. Deleting an unknown session is not an error.
    fn delete_session(&self, session_id: &SessionId) -> StoreResult<()>;

    /// Delete every session belonging to a user
    fn delete_user_sessions(&self, user_id: UserId) -> StoreResult<u64>;

    /// Delete every session that expired at or before `now`
    fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

/// Trait for password reset and email verification tokens
pub trait TokenStore: Send + Sync {
    /// Store a new reset token, marking the user's earlier unused tokens as used
    fn create_reset_token(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<ResetToken>;

    /// Atomically mark a usable reset token as used and return its owner.
    ///
    /// Returns `None` when the token is unknown, already used or expired. Of
    /// two concurrent calls with the same token at most one gets `Some`.
    fn consume_reset_token(&self, token: &str, now: DateTime<Utc>) -> StoreResult<Option<UserId>>;

    /// Get a reset token regardless of state
    fn get_reset_token(&self, token: &str) -> StoreResult<Option<ResetToken>>;

    /// Number of reset tokens ever issued
    fn count_reset_tokens(&self) -> StoreResult<u64>;

    /// Store a new verification token
    fn create_verification_token(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<VerificationToken>;

    /// Consume an unexpired verification token, deleting all of the owner's
    /// verification tokens, and return the owner
    fn consume_verification_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<UserId>>;

    /// Delete every verification token belonging to a user
    fn delete_verification_tokens(&self, user_id: UserId) -> StoreResult<u64>;
}

/// Trait for the order rows account deletion has to anonymize
pub trait OrderStore: Send + Sync {
    /// Record an order
    fn create_order(&self, order: NewOrder) -> StoreResult<Order>;

    /// Get an order by ID
    fn get_order(&self, order_id: OrderId) -> StoreResult<Option<Order>>;

    /// Detach a user's orders: null the owner, email and billing customer id
    fn detach_orders(&self, user_id: UserId) -> StoreResult<u64>;
}

/// Everything the service needs from its backing store
pub trait AuthStore: UserStore + SessionStore + TokenStore + OrderStore {
    /// Detach the user's orders and delete the user as one operation.
    ///
    /// Either both happen or neither does. Returns the number of orders detached.
    fn delete_account(&self, user_id: UserId) -> StoreResult<u64>;
}
