//! Storefront account primitives
//!
//! Transport-independent building blocks for the account service:
//! - Password hashing, verification and the strength rule
//! - Opaque random tokens for sessions, password resets and email verification
//! - The role model separating customers from administrators

pub mod error;
pub mod password;
pub mod role;
pub mod token;

pub use error::Error;
pub use password::{
    hash_password, validate_strength, verify_password, MAX_PASSWORD_BYTES,
    MIN_PASSWORD_LENGTH,
};
pub use role::Role;
pub use token::generate_token;

/// Result type for storefront-auth-core operations
pub type Result<T> = std::result::Result<T, Error>;
