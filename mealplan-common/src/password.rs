//! Password hashing
//!
//! Argon2id with a random salt per password; hashes are stored as PHC strings
//! (`$argon2id$v=19$...`) so the parameters travel with the hash.

use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;

use crate::{Error, Result};

/// Minimum accepted password length (characters)
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Hash a password for storage
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Internal(format!("Failed to hash password: {}", e)))
}

/// Check a password against a stored hash
///
/// A stored hash that cannot be parsed never verifies.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Validate a new password before hashing
pub fn validate_new_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(Error::InvalidInput(format!(
            "New password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("admin123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("admin123", &hash));
        assert!(!verify_password("admin124", &hash));
    }

    #[test]
    fn test_same_password_different_salt() {
        let a = hash_password("secret-pass").unwrap();
        let b = hash_password("secret-pass").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("secret-pass", &a));
        assert!(verify_password("secret-pass", &b));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("anything", ""));
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn test_validate_new_password() {
        assert!(validate_new_password("12345").is_err());
        assert!(validate_new_password("123456").is_ok());
    }
}
