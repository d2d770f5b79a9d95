use anyhow::anyhow;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use crate::error::AccountServiceError;
use crate::usecase::token::generate_token;

/// Hash a password with argon2id and a random salt. Returns a PHC string.
pub fn hash_password(plaintext: &str) -> Result<String, AccountServiceError> {
    let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>())
        .map_err(|e| anyhow!("encode password salt: {e}"))?;
    let hash = Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|e| anyhow!("hash password: {e}"))?;
    Ok(hash.to_string())
}

/// Constant-time check of `plaintext` against a stored hash. A malformed
/// hash never verifies.
pub fn verify_password(plaintext: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is malformed");
            return false;
        }
    };
    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok()
}

/// Hash of a random secret nobody knows. Used for invited accounts until
/// they confirm their email and choose a password.
pub fn unusable_password_hash() -> Result<String, AccountServiceError> {
    hash_password(&generate_token())
}
