//! One-time codes and generated passwords.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Minutes an issued OTP stays valid.
pub const OTP_TTL_MINUTES: i64 = 10;

/// Length of a generated password.
pub const GENERATED_PASSWORD_LENGTH: usize = 6;

/// Generate a 6-digit code in `100000..=999999`.
#[must_use]
pub fn generate_otp() -> String {
    let code: u32 = rand::rng().random_range(100_000..=999_999);
    code.to_string()
}

/// Hash a code for storage. Codes are compared by hash only.
#[must_use]
pub fn hash_otp(code: &str) -> String {
    hex::encode(Sha256::digest(code.trim().as_bytes()))
}

/// Generate a password of lower-case ASCII letters.
#[must_use]
pub fn generate_password() -> String {
    let mut rng = rand::rng();
    (0..GENERATED_PASSWORD_LENGTH)
        .map(|_| char::from(rng.random_range(b'a'..=b'z')))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_otp_format() {
        for _ in 0..100 {
            let code = generate_otp();
            assert_eq!(code.len(), 6);
            let n: u32 = code.parse().unwrap();
            assert!((100_000..=999_999).contains(&n));
        }
    }

    #[test]
    fn test_hash_otp_is_stable_hex() {
        let hash = hash_otp("123456");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_otp(" 123456 "));
        assert_ne!(hash, hash_otp("123457"));
        assert_eq!(
            hash_otp(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_generate_password() {
        let password = generate_password();
        assert_eq!(password.len(), GENERATED_PASSWORD_LENGTH);
        assert!(password.chars().all(|c| c.is_ascii_lowercase()));
    }
}
