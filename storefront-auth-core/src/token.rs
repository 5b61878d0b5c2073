//! Opaque bearer secrets

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::rngs::OsRng;
use rand::RngCore;

/// Number of random bytes behind every token
pub const TOKEN_BYTES: usize = 32;

/// Generate an unguessable token, base64url encoded without padding.
///
/// Used for session ids, password reset tokens and verification tokens.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
