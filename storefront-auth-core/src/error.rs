//! Error types for the account primitives

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("password too short (minimum {min} characters)")]
    PasswordTooShort { min: usize },

    #[error("password too long (maximum {max} bytes)")]
    PasswordTooLong { max: usize },

    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("unknown role: {0}")]
    InvalidRole(String),
}
