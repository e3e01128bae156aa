//! Password hashing with bcrypt.

use anyhow::anyhow;
use bcrypt::{DEFAULT_COST, hash, verify};

use crate::errors::AppError;

/// Shortest password accepted anywhere a password is set.
pub const MIN_PASSWORD_LENGTH: u64 = 8;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::internal(anyhow!("Failed to hash password: {}", e)))
}

/// Checks `password` against a stored bcrypt hash.
///
/// A malformed stored hash is reported as a mismatch rather than an error so
/// that login always answers with the same message.
pub fn verify_password(password: &str, hashed: &str) -> Result<bool, AppError> {
    match verify(password, hashed) {
        Ok(matches) => Ok(matches),
        Err(e) => {
            tracing::debug!(error = %e, "Stored password hash could not be parsed");
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hashed = hash_password("learning-is-fun").unwrap();
        assert_ne!(hashed, "learning-is-fun");
        assert!(verify_password("learning-is-fun", &hashed).unwrap());
        assert!(!verify_password("learning-is-not-fun", &hashed).unwrap());
    }

    #[test]
    fn garbage_hash_is_a_mismatch() {
        assert!(!verify_password("anything", "not-a-bcrypt-hash").unwrap());
    }
}
