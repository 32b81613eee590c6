//! Admin bearer tokens (HS256). Signed with a secret the storefront never
//! sees, and carrying the `admin` role.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use strives_core::AdminUserId;

use super::AuthError;
use crate::config::JwtConfig;

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: i32,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenKeys {
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::days(config.expires_in_days),
        }
    }

    /// # Errors
    ///
    /// Returns `AuthError::TokenSigning` if encoding fails.
    pub fn issue(&self, admin_id: AdminUserId) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: admin_id.as_i32(),
            role: ADMIN_ROLE.to_owned(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(AuthError::TokenSigning)
    }

    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` unless the token is a valid,
    /// unexpired admin token signed with this key.
    pub fn verify(&self, token: &str) -> Result<AdminUserId, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|_| AuthError::InvalidToken)?;
        if data.claims.role != ADMIN_ROLE {
            return Err(AuthError::InvalidToken);
        }
        Ok(AdminUserId::new(data.claims.sub))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn keys(secret: &str) -> TokenKeys {
        TokenKeys::new(&JwtConfig {
            secret: SecretString::from(secret),
            expires_in_days: 1,
        })
    }

    #[test]
    fn test_issued_token_verifies() {
        let keys = keys("k7Qm2xV9pL4rT8wZ1nB6cH3jF5sD0gY!");
        let token = keys.issue(AdminUserId::new(3)).unwrap();
        assert_eq!(keys.verify(&token).unwrap(), AdminUserId::new(3));
    }

    #[test]
    fn test_customer_token_rejected() {
        let keys = keys("k7Qm2xV9pL4rT8wZ1nB6cH3jF5sD0gY!");
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: 3,
            role: "customer".to_owned(),
            iat: now,
            exp: now + 60,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding).unwrap();
        assert!(matches!(keys.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_other_key_rejected() {
        let token = keys("k7Qm2xV9pL4rT8wZ1nB6cH3jF5sD0gY!")
            .issue(AdminUserId::new(3))
            .unwrap();
        let other = keys("Zr5!tW8#yU1$iO4%pA7^sD0&fG3*hJ6(");
        assert!(other.verify(&token).is_err());
    }
}
