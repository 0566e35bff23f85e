//! API token generation and hashing.
//!
//! Registry clients authenticate follow-up requests with a random token
//! issued at login. Only the SHA-256 digest is persisted; the plaintext is
//! handed to the caller once.

use rand::Rng;

/// Length of a generated token (alphanumeric characters).
pub const TOKEN_LENGTH: usize = 48;

/// A freshly generated token.
pub struct GeneratedToken {
    /// Returned to the client exactly once, never stored.
    pub plaintext: String,
    /// SHA-256 hex digest stored in `users.token_hash`.
    pub hash: String,
}

/// Generate a new random token together with its storage hash.
pub fn generate_token() -> GeneratedToken {
    let plaintext: String = rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect();
    let hash = hash_token(&plaintext);
    GeneratedToken { plaintext, hash }
}

/// Compute the storage hash of a plaintext token.
pub fn hash_token(token: &str) -> String {
    crate::hashing::sha256_hex(token.as_bytes())
}
