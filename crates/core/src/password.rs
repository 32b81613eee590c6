//! Password policy and argon2 hashing.
//!
//! Storefront users and admins share the same hashing so the CLI can create
//! admin accounts without depending on either server.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("password must be at least {min} characters")]
    TooShort { min: usize },
    #[error("password hashing failed")]
    Hash,
    #[error("password does not match")]
    Mismatch,
}

/// Check a new password against the policy.
///
/// # Errors
///
/// Returns [`PasswordError::TooShort`] below [`MIN_PASSWORD_LENGTH`]
/// characters.
pub fn validate_password(password: &str) -> Result<(), PasswordError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PasswordError::TooShort {
            min: MIN_PASSWORD_LENGTH,
        });
    }
    Ok(())
}

/// Hash a password into a PHC string.
///
/// # Errors
///
/// Returns [`PasswordError::Hash`] if argon2 fails.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| PasswordError::Hash)
}

/// Verify a password against a stored PHC string.
///
/// # Errors
///
/// Returns [`PasswordError::Mismatch`] for a wrong password or an
/// unparseable hash.
pub fn verify_password(password: &str, hash: &str) -> Result<(), PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|_| PasswordError::Mismatch)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| PasswordError::Mismatch)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert_eq!(
            verify_password("wrong horse", &hash),
            Err(PasswordError::Mismatch)
        );
    }

    #[test]
    fn test_garbage_hash_is_mismatch() {
        assert_eq!(
            verify_password("anything", "not-a-hash"),
            Err(PasswordError::Mismatch)
        );
    }

    #[test]
    fn test_policy() {
        assert!(validate_password("12345678").is_ok());
        assert_eq!(
            validate_password("short"),
            Err(PasswordError::TooShort { min: 8 })
        );
    }
}
