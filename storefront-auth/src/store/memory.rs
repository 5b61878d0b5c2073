//! In-memory storage implementation

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use storefront_auth_core::{generate_token, Role};

use super::{
    AuthStore, NewOrder, NewUser, Order, OrderId, OrderStore, ResetToken, Session, SessionId, SessionStore,
    StoreResult, TokenStore, User, UserId, UserStore, VerificationToken, DEFAULT_PLAN,
};
use crate::error::AuthError;

/// In-memory store implementing every store trait.
///
/// Each table sits behind its own lock; operations that must be atomic take
/// the relevant write lock for their whole duration.
pub struct InMemoryStore {
    users: RwLock<HashMap<UserId, User>>,
    sessions: RwLock<HashMap<SessionId, Session>>,
    reset_tokens: RwLock<HashMap<String, ResetToken>>,
    verification_tokens: RwLock<HashMap<String, VerificationToken>>,
    orders: RwLock<HashMap<OrderId, Order>>,
    next_user_id: AtomicU64,
    next_order_id: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
            reset_tokens: RwLock::new(HashMap::new()),
            verification_tokens: RwLock::new(HashMap::new()),
            orders: RwLock::new(HashMap::new()),
            next_user_id: AtomicU64::new(1),
            next_order_id: AtomicU64::new(1),
        }
    }

    /// Number of live session rows, expired or not (for testing purposes)
    pub fn session_count(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    /// Number of verification token rows (for testing purposes)
    pub fn verification_token_count(&self, user_id: UserId) -> usize {
        self.verification_tokens
            .read()
            .unwrap()
            .values()
            .filter(|t| t.user_id == user_id)
            .count()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl UserStore for InMemoryStore {
    fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        let normalized = new_user.email.to_lowercase();
        let mut users = self.users.write().unwrap();
        if users.values().any(|u| u.email == normalized) {
            return Err(AuthError::email_taken());
        }

        let user = User {
            id: UserId(self.next_user_id.fetch_add(1, Ordering::SeqCst)),
            email: normalized,
            password_hash: new_user.password_hash,
            name: new_user.name,
            role: new_user.role,
            plan: DEFAULT_PLAN.to_string(),
            stripe_customer_id: None,
            email_verified: false,
            created_at: Utc::now(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    fn get_user(&self, user_id: UserId) -> StoreResult<Option<User>> {
        Ok(self.users.read().unwrap().get(&user_id).cloned())
    }

    fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let normalized = email.to_lowercase();
        let users = self.users.read().unwrap();
        Ok(users.values().find(|u| u.email == normalized).cloned())
    }

    fn list_users(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self.users.read().unwrap().values().cloned().collect();
        users.sort_by_key(|u| u.id.0);
        Ok(users)
    }

    fn update_password(&self, user_id: UserId, password_hash: &str) -> StoreResult<()> {
        let mut users = self.users.write().unwrap();
        let user = users.get_mut(&user_id).ok_or(AuthError::NotFound)?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    fn set_role(&self, user_id: UserId, role: Role) -> StoreResult<()> {
        let mut users = self.users.write().unwrap();
        let user = users.get_mut(&user_id).ok_or(AuthError::NotFound)?;
        user.role = role;
        Ok(())
    }

    fn mark_email_verified(&self, user_id: UserId) -> StoreResult<()> {
        let mut users = self.users.write().unwrap();
        let user = users.get_mut(&user_id).ok_or(AuthError::NotFound)?;
        user.email_verified = true;
        Ok(())
    }

    fn delete_user(&self, user_id: UserId) -> StoreResult<()> {
        self.users.write().unwrap().remove(&user_id);

        // Mirror the ON DELETE CASCADE of the SQL schema
        self.sessions
            .write()
            .unwrap()
            .retain(|_, s| s.user_id != user_id);
        self.reset_tokens
            .write()
            .unwrap()
            .retain(|_, t| t.user_id != user_id);
        self.verification_tokens
            .write()
            .unwrap()
            .retain(|_, t| t.user_id != user_id);

        Ok(())
    }
}

impl SessionStore for InMemoryStore {
    fn create_session(&self, user_id: UserId, expires_at: DateTime<Utc>) -> StoreResult<Session> {
        let session = Session {
            id: SessionId(generate_token()),
            user_id,
            expires_at,
            created_at: Utc::now(),
        };
        self.sessions
            .write()
            .unwrap()
            .insert(session.id.clone(), session.clone());
        Ok(session)
    }

    fn find_session_user(
        &self,
        session_id: &SessionId,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        let user_id = {
            let sessions = self.sessions.read().unwrap();
            match sessions.get(session_id) {
                Some(session) if session.is_valid_at(now) => session.user_id,
                _ => return Ok(None),
            }
        };
        self.get_user(user_id)
    }

    fn delete_session(&self, session_id: &SessionId) -> StoreResult<()> {
        self.sessions.write().unwrap().remove(session_id);
        Ok(())
    }

    fn delete_user_sessions(&self, user_id: UserId) -> StoreResult<u64> {
        let mut sessions = self.sessions.write().unwrap();
        let before = sessions.len();
        sessions.retain(|_, s| s.user_id != user_id);
        Ok((before - sessions.len()) as u64)
    }

    fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut sessions = self.sessions.write().unwrap();
        let before = sessions.len();
        sessions.retain(|_, s| s.is_valid_at(now));
        Ok((before - sessions.len()) as u64)
    }
}

impl TokenStore for InMemoryStore {
    fn create_reset_token(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<ResetToken> {
        let mut tokens = self.reset_tokens.write().unwrap();
        for existing in tokens.values_mut().filter(|t| t.user_id == user_id) {
            existing.used = true;
        }

        let reset = ResetToken {
            token: token.to_string(),
            user_id,
            expires_at,
            used: false,
            created_at: Utc::now(),
        };
        tokens.insert(reset.token.clone(), reset.clone());
        Ok(reset)
    }

    fn consume_reset_token(&self, token: &str, now: DateTime<Utc>) -> StoreResult<Option<UserId>> {
        let mut tokens = self.reset_tokens.write().unwrap();
        match tokens.get_mut(token) {
            Some(reset) if reset.is_usable_at(now) => {
                reset.used = true;
                Ok(Some(reset.user_id))
            }
            _ => Ok(None),
        }
    }

    fn get_reset_token(&self, token: &str) -> StoreResult<Option<ResetToken>> {
        Ok(self.reset_tokens.read().unwrap().get(token).cloned())
    }

    fn count_reset_tokens(&self) -> StoreResult<u64> {
        Ok(self.reset_tokens.read().unwrap().len() as u64)
    }

    fn create_verification_token(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<VerificationToken> {
        let verification = VerificationToken {
            token: token.to_string(),
            user_id,
            expires_at,
            created_at: Utc::now(),
        };
        self.verification_tokens
            .write()
            .unwrap()
            .insert(verification.token.clone(), verification.clone());
        Ok(verification)
    }

    fn consume_verification_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<UserId>> {
        let mut tokens = self.verification_tokens.write().unwrap();
        let user_id = match tokens.get(token) {
            Some(t) if t.expires_at > now => t.user_id,
            _ => return Ok(None),
        };
        tokens.retain(|_, t| t.user_id != user_id);
        Ok(Some(user_id))
    }

    fn delete_verification_tokens(&self, user_id: UserId) -> StoreResult<u64> {
        let mut tokens = self.verification_tokens.write().unwrap();
        let before = tokens.len();
        tokens.retain(|_, t| t.user_id != user_id);
        Ok((before - tokens.len()) as u64)
    }
}

impl OrderStore for InMemoryStore {
    fn create_order(&self, order: NewOrder) -> StoreResult<Order> {
        let order = Order {
            id: OrderId(self.next_order_id.fetch_add(1, Ordering::SeqCst)),
            user_id: order.user_id,
            email: order.email,
            stripe_customer_id: order.stripe_customer_id,
            amount_cents: order.amount_cents,
            created_at: Utc::now(),
        };
        self.orders.write().unwrap().insert(order.id, order.clone());
        Ok(order)
    }

    fn get_order(&self, order_id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.orders.read().unwrap().get(&order_id).cloned())
    }

    fn detach_orders(&self, user_id: UserId) -> StoreResult<u64> {
        let mut orders = self.orders.write().unwrap();
        let mut detached = 0;
        for order in orders.values_mut().filter(|o| o.user_id == Some(user_id)) {
            order.user_id = None;
            order.email = None;
            order.stripe_customer_id = None;
            detached += 1;
        }
        Ok(detached)
    }
}

impl AuthStore for InMemoryStore {
    fn delete_account(&self, user_id: UserId) -> StoreResult<u64> {
        // Both locks held so no reader sees detached orders next to a live user
        let mut orders = self.orders.write().unwrap();
        let mut users = self.users.write().unwrap();

        let mut detached = 0;
        for order in orders.values_mut().filter(|o| o.user_id == Some(user_id)) {
            order.user_id = None;
            order.email = None;
            order.stripe_customer_id = None;
            detached += 1;
        }
        users.remove(&user_id);
        drop(users);
        drop(orders);

        self.delete_user(user_id)?;
        Ok(detached)
    }
}
