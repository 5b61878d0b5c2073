//! Storefront account service
//!
//! Cookie sessions, password recovery, email verification and the
//! user/admin authorization gate in front of the storefront API.

pub mod config;
pub mod email;
pub mod error;
pub mod identity;
pub mod notify;
pub mod routes;
pub mod state;
pub mod store;
pub mod sweep;

pub use config::{AuthSettings, Config};
pub use email::{ConsoleEmailSender, EmailSender, SmtpConfig, SmtpEmailSender};
pub use error::AuthError;
pub use identity::{CurrentUser, RequireAdmin, RequireUser};
pub use state::AppState;
pub use store::{AuthStore, InMemoryStore, SqliteStore};
pub use sweep::SessionSweeper;
