//! Password hashing and the strength rule
//!
//! Hashes are bcrypt with a caller-chosen cost so tests can run at the
//! minimum cost while production uses [`DEFAULT_COST`].

use crate::{Error, Result};

/// Minimum password length, counted in characters
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Longest accepted password in bytes; bcrypt ignores anything past this
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Default bcrypt cost factor
pub const DEFAULT_COST: u32 = 12;

/// Hash a password with bcrypt at the given cost
pub fn hash_password(password: &str, cost: u32) -> Result<String> {
    Ok(bcrypt::hash(password, cost)?)
}

/// Verify a password against a stored hash.
///
/// A malformed or empty hash never matches; it is not an error.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Reject passwords shorter than [`MIN_PASSWORD_LENGTH`] characters or
/// longer than [`MAX_PASSWORD_BYTES`] bytes
pub fn validate_strength(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(Error::PasswordTooShort {
            min: MIN_PASSWORD_LENGTH,
        });
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(Error::PasswordTooLong {
            max: MAX_PASSWORD_BYTES,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[test]
    fn test_password_hash_and_verify() {
        let password = "correct horse battery staple";
        let hash = hash_password(password, TEST_COST).unwrap();

        assert!(verify_password(password, &hash));
        assert!(!verify_password("wrong password", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("Aa123456", TEST_COST).unwrap();
        let b = hash_password("Aa123456", TEST_COST).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_does_not_match() {
        assert!(!verify_password("Aa123456", "not-a-bcrypt-hash"));
        assert!(!verify_password("Aa123456", ""));
    }

    #[test]
    fn test_strength_boundary() {
        assert!(matches!(
            validate_strength("1234567"),
            Err(Error::PasswordTooShort { min: 8 })
        ));
        assert!(validate_strength("12345678").is_ok());
        assert!(validate_strength("").is_err());
    }

    #[test]
    fn test_strength_counts_characters_not_bytes() {
        // 7 characters, 14 bytes
        assert!(validate_strength("ééééééé").is_err());
        assert!(validate_strength("éééééééé").is_ok());
    }

    #[test]
    fn test_strength_rejects_bytes_bcrypt_would_drop() {
        assert!(validate_strength(&"a".repeat(MAX_PASSWORD_BYTES)).is_ok());
        assert!(matches!(
            validate_strength(&"a".repeat(MAX_PASSWORD_BYTES + 1)),
            Err(Error::PasswordTooLong { max: 72 })
        ));
        // 37 characters, 74 bytes
        assert!(validate_strength(&"é".repeat(37)).is_err());
    }
}
