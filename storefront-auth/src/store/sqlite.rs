//! SQLite-based storage implementation

use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use storefront_auth_core::{generate_token, Role};

use super::{
    AuthStore, NewOrder, NewUser, Order, OrderId, OrderStore, ResetToken, Session, SessionId, SessionStore,
    StoreResult, TokenStore, User, UserId, UserStore, VerificationToken, DEFAULT_PLAN,
};
use crate::error::AuthError;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

const USER_COLUMNS: &str =
    "id, email, password_hash, name, role, plan, stripe_customer_id, email_verified, created_at";

/// SQLite-based store implementing every store trait
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

fn db_err(e: rusqlite::Error) -> AuthError {
    AuthError::Internal(e.to_string())
}

/// Fixed-width UTC timestamps so that text comparison in SQL is chronological
fn ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp; a malformed value is a conversion error on column `idx`
fn parse_ts(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_role(idx: usize, s: &str) -> rusqlite::Result<Role> {
    s.parse().map_err(|e: storefront_auth_core::Error| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.to_string().into())
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let id: i64 = row.get(0)?;
    let role: String = row.get(4)?;
    let email_verified: i32 = row.get(7)?;
    let created_at: String = row.get(8)?;
    Ok(User {
        id: UserId(id as u64),
        email: row.get(1)?,
        password_hash: row.get(2)?,
        name: row.get(3)?,
        role: parse_role(4, &role)?,
        plan: row.get(5)?,
        stripe_customer_id: row.get(6)?,
        email_verified: email_verified != 0,
        created_at: parse_ts(8, &created_at)?,
    })
}

fn order_from_row(row: &Row<'_>) -> rusqlite::Result<Order> {
    let id: i64 = row.get(0)?;
    let user_id: Option<i64> = row.get(1)?;
    let created_at: String = row.get(5)?;
    Ok(Order {
        id: OrderId(id as u64),
        user_id: user_id.map(|id| UserId(id as u64)),
        email: row.get(2)?,
        stripe_customer_id: row.get(3)?,
        amount_cents: row.get(4)?,
        created_at: parse_ts(5, &created_at)?,
    })
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path
    pub fn open(path: &str) -> Result<Self, AuthError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::init(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, AuthError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, AuthError> {
        // Enable foreign keys
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(db_err)?;

        // Run migrations
        Self::migrate(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run database migrations
    fn migrate(conn: &Connection) -> Result<(), AuthError> {
        let current_version = Self::schema_version(conn)?;

        if current_version < SCHEMA_VERSION {
            tracing::info!(
                current = current_version,
                target = SCHEMA_VERSION,
                "Running database migrations"
            );

            if current_version < 1 {
                Self::migrate_v1(conn)?;
            }

            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )
            .map_err(db_err)?;

            tracing::info!("Database migrations complete");
        }

        Ok(())
    }

    /// Get current schema version (0 if no schema exists)
    pub fn schema_version(conn: &Connection) -> Result<i32, AuthError> {
        let table_exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
                [],
                |row| row.get(0),
            )
            .map_err(db_err)?;

        if !table_exists {
            return Ok(0);
        }

        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0).map(|v| v.unwrap_or(0))
        })
        .map_err(db_err)
    }

    /// Schema version of this store's database
    pub fn current_schema_version(&self) -> Result<i32, AuthError> {
        let conn = self.conn.lock().unwrap();
        Self::schema_version(&conn)
    }

    /// Migration to version 1: initial schema
    fn migrate_v1(conn: &Connection) -> Result<(), AuthError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password_hash TEXT NOT NULL,
                name TEXT,
                role TEXT NOT NULL DEFAULT 'user',
                plan TEXT NOT NULL DEFAULT 'free',
                stripe_customer_id TEXT,
                email_verified INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                expires_at TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);

            -- Reset tokens are kept after use as an audit trail
            CREATE TABLE IF NOT EXISTS reset_tokens (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                token TEXT NOT NULL UNIQUE,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                expires_at TEXT NOT NULL,
                used INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_reset_tokens_user_id ON reset_tokens(user_id);

            CREATE TABLE IF NOT EXISTS verification_tokens (
                token TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                expires_at TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_verification_tokens_user_id ON verification_tokens(user_id);

            -- Orders survive account deletion with their identifying columns cleared
            CREATE TABLE IF NOT EXISTS orders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
                email TEXT,
                stripe_customer_id TEXT,
                amount_cents INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_orders_user_id ON orders(user_id);
            "#,
        )
        .map_err(db_err)?;

        Ok(())
    }
}

impl UserStore for SqliteStore {
    fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        let conn = self.conn.lock().unwrap();
        let normalized = new_user.email.to_lowercase();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO users (email, password_hash, name, role, plan, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                normalized,
                new_user.password_hash,
                new_user.name,
                new_user.role.as_str(),
                DEFAULT_PLAN,
                ts(now),
            ],
        )
        .map_err(|e| {
            if let rusqlite::Error::SqliteFailure(ref err, _) = e {
                if err.code == rusqlite::ErrorCode::ConstraintViolation {
                    return AuthError::email_taken();
                }
            }
            db_err(e)
        })?;

        let id = conn.last_insert_rowid() as u64;
        Ok(User {
            id: UserId(id),
            email: normalized,
            password_hash: new_user.password_hash,
            name: new_user.name,
            role: new_user.role,
            plan: DEFAULT_PLAN.to_string(),
            stripe_customer_id: None,
            email_verified: false,
            created_at: parse_ts(8, &ts(now)).map_err(db_err)?,
        })
    }

    fn get_user(&self, user_id: UserId) -> StoreResult<Option<User>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![user_id.0 as i64],
            user_from_row,
        )
        .optional()
        .map_err(db_err)
    }

    fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            params![email.to_lowercase()],
            user_from_row,
        )
        .optional()
        .map_err(db_err)
    }

    fn list_users(&self) -> StoreResult<Vec<User>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
            .map_err(db_err)?;

        let users = stmt
            .query_map([], user_from_row)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;

        Ok(users)
    }

    fn update_password(&self, user_id: UserId, password_hash: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn
            .execute(
                "UPDATE users SET password_hash = ?1 WHERE id = ?2",
                params![password_hash, user_id.0 as i64],
            )
            .map_err(db_err)?;

        if rows_affected == 0 {
            return Err(AuthError::NotFound);
        }

        Ok(())
    }

    fn set_role(&self, user_id: UserId, role: Role) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn
            .execute(
                "UPDATE users SET role = ?1 WHERE id = ?2",
                params![role.as_str(), user_id.0 as i64],
            )
            .map_err(db_err)?;

        if rows_affected == 0 {
            return Err(AuthError::NotFound);
        }

        Ok(())
    }

    fn mark_email_verified(&self, user_id: UserId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn
            .execute(
                "UPDATE users SET email_verified = 1 WHERE id = ?1",
                params![user_id.0 as i64],
            )
            .map_err(db_err)?;

        if rows_affected == 0 {
            return Err(AuthError::NotFound);
        }

        Ok(())
    }

    fn delete_user(&self, user_id: UserId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        // Foreign keys cascade to sessions and tokens, and null out orders
        conn.execute("DELETE FROM users WHERE id = ?1", params![user_id.0 as i64])
            .map_err(db_err)?;

        Ok(())
    }
}

impl SessionStore for SqliteStore {
    fn create_session(&self, user_id: UserId, expires_at: DateTime<Utc>) -> StoreResult<Session> {
        let conn = self.conn.lock().unwrap();
        let session = Session {
            id: SessionId(generate_token()),
            user_id,
            expires_at,
            created_at: Utc::now(),
        };

        conn.execute(
            "INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                session.id.0,
                session.user_id.0 as i64,
                ts(session.expires_at),
                ts(session.created_at),
            ],
        )
        .map_err(db_err)?;

        Ok(session)
    }

    fn find_session_user(
        &self,
        session_id: &SessionId,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT u.id, u.email, u.password_hash, u.name, u.role, u.plan,
                    u.stripe_customer_id, u.email_verified, u.created_at
             FROM sessions s JOIN users u ON u.id = s.user_id
             WHERE s.id = ?1 AND s.expires_at > ?2",
            params![session_id.0, ts(now)],
            user_from_row,
        )
        .optional()
        .map_err(db_err)
    }

    fn delete_session(&self, session_id: &SessionId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id.0])
            .map_err(db_err)?;

        Ok(())
    }

    fn delete_user_sessions(&self, user_id: UserId) -> StoreResult<u64> {
        let conn = self.conn.lock().unwrap();

        let rows_deleted = conn
            .execute(
                "DELETE FROM sessions WHERE user_id = ?1",
                params![user_id.0 as i64],
            )
            .map_err(db_err)?;

        Ok(rows_deleted as u64)
    }

    fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let conn = self.conn.lock().unwrap();

        let rows_deleted = conn
            .execute(
                "DELETE FROM sessions WHERE expires_at <= ?1",
                params![ts(now)],
            )
            .map_err(db_err)?;

        Ok(rows_deleted as u64)
    }
}

impl TokenStore for SqliteStore {
    fn create_reset_token(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<ResetToken> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(db_err)?;
        let reset = ResetToken {
            token: token.to_string(),
            user_id,
            expires_at,
            used: false,
            created_at: Utc::now(),
        };

        tx.execute(
            "UPDATE reset_tokens SET used = 1 WHERE user_id = ?1 AND used = 0",
            params![user_id.0 as i64],
        )
        .map_err(db_err)?;

        tx.execute(
            "INSERT INTO reset_tokens (token, user_id, expires_at, used, created_at)
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![
                reset.token,
                reset.user_id.0 as i64,
                ts(reset.expires_at),
                ts(reset.created_at),
            ],
        )
        .map_err(db_err)?;

        tx.commit().map_err(db_err)?;
        Ok(reset)
    }

    fn consume_reset_token(&self, token: &str, now: DateTime<Utc>) -> StoreResult<Option<UserId>> {
        let conn = self.conn.lock().unwrap();

        // Find and mark in one conditional statement
        let user_id: Option<i64> = conn
            .query_row(
                "UPDATE reset_tokens SET used = 1
                 WHERE token = ?1 AND used = 0 AND expires_at > ?2
                 RETURNING user_id",
                params![token, ts(now)],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;

        Ok(user_id.map(|id| UserId(id as u64)))
    }

    fn get_reset_token(&self, token: &str) -> StoreResult<Option<ResetToken>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT token, user_id, expires_at, used, created_at FROM reset_tokens WHERE token = ?1",
            params![token],
            |row| {
                let user_id: i64 = row.get(1)?;
                let expires_at: String = row.get(2)?;
                let used: i32 = row.get(3)?;
                let created_at: String = row.get(4)?;
                Ok(ResetToken {
                    token: row.get(0)?,
                    user_id: UserId(user_id as u64),
                    expires_at: parse_ts(2, &expires_at)?,
                    used: used != 0,
                    created_at: parse_ts(4, &created_at)?,
                })
            },
        )
        .optional()
        .map_err(db_err)
    }

    fn count_reset_tokens(&self) -> StoreResult<u64> {
        let conn = self.conn.lock().unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM reset_tokens", [], |row| row.get(0))
            .map_err(db_err)?;

        Ok(count as u64)
    }

    fn create_verification_token(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<VerificationToken> {
        let conn = self.conn.lock().unwrap();
        let verification = VerificationToken {
            token: token.to_string(),
            user_id,
            expires_at,
            created_at: Utc::now(),
        };

        conn.execute(
            "INSERT INTO verification_tokens (token, user_id, expires_at, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                verification.token,
                verification.user_id.0 as i64,
                ts(verification.expires_at),
                ts(verification.created_at),
            ],
        )
        .map_err(db_err)?;

        Ok(verification)
    }

    fn consume_verification_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<UserId>> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(db_err)?;

        let user_id: Option<i64> = tx
            .query_row(
                "SELECT user_id FROM verification_tokens WHERE token = ?1 AND expires_at > ?2",
                params![token, ts(now)],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;

        let Some(user_id) = user_id else {
            return Ok(None);
        };

        tx.execute(
            "DELETE FROM verification_tokens WHERE user_id = ?1",
            params![user_id],
        )
        .map_err(db_err)?;

        tx.commit().map_err(db_err)?;
        Ok(Some(UserId(user_id as u64)))
    }

    fn delete_verification_tokens(&self, user_id: UserId) -> StoreResult<u64> {
        let conn = self.conn.lock().unwrap();

        let rows_deleted = conn
            .execute(
                "DELETE FROM verification_tokens WHERE user_id = ?1",
                params![user_id.0 as i64],
            )
            .map_err(db_err)?;

        Ok(rows_deleted as u64)
    }
}

impl OrderStore for SqliteStore {
    fn create_order(&self, order: NewOrder) -> StoreResult<Order> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO orders (user_id, email, stripe_customer_id, amount_cents, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                order.user_id.map(|id| id.0 as i64),
                order.email,
                order.stripe_customer_id,
                order.amount_cents,
                ts(now),
            ],
        )
        .map_err(db_err)?;

        Ok(Order {
            id: OrderId(conn.last_insert_rowid() as u64),
            user_id: order.user_id,
            email: order.email,
            stripe_customer_id: order.stripe_customer_id,
            amount_cents: order.amount_cents,
            created_at: now,
        })
    }

    fn get_order(&self, order_id: OrderId) -> StoreResult<Option<Order>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT id, user_id, email, stripe_customer_id, amount_cents, created_at
             FROM orders WHERE id = ?1",
            params![order_id.0 as i64],
            order_from_row,
        )
        .optional()
        .map_err(db_err)
    }

    fn detach_orders(&self, user_id: UserId) -> StoreResult<u64> {
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn
            .execute(
                "UPDATE orders SET user_id = NULL, email = NULL, stripe_customer_id = NULL
                 WHERE user_id = ?1",
                params![user_id.0 as i64],
            )
            .map_err(db_err)?;

        Ok(rows_affected as u64)
    }
}

impl AuthStore for SqliteStore {
    fn delete_account(&self, user_id: UserId) -> StoreResult<u64> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(db_err)?;

        let detached = tx
            .execute(
                "UPDATE orders SET user_id = NULL, email = NULL, stripe_customer_id = NULL
                 WHERE user_id = ?1",
                params![user_id.0 as i64],
            )
            .map_err(db_err)?;

        // Foreign keys cascade to sessions and tokens
        tx.execute("DELETE FROM users WHERE id = ?1", params![user_id.0 as i64])
            .map_err(db_err)?;

        tx.commit().map_err(db_err)?;
        Ok(detached as u64)
    }
}
