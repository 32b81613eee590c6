//! Bearer token issuance and verification (HS256).

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use strives_core::UserId;

use super::AuthError;
use crate::config::JwtConfig;

/// Role carried by storefront tokens.
pub const CUSTOMER_ROLE: &str = "customer";

/// Token claims.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: i32,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signing and verification keys for customer tokens.
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

    /// Issue a token for a customer.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenSigning` if encoding fails.
    pub fn issue(&self, user_id: UserId) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.as_i32(),
            role: CUSTOMER_ROLE.to_owned(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(AuthError::TokenSigning)
    }

    /// Verify a token and return the customer it was issued to.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token is malformed, expired,
    /// signed with another key or not a customer token.
    pub fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|_| AuthError::InvalidToken)?;
        if data.claims.role != CUSTOMER_ROLE {
            return Err(AuthError::InvalidToken);
        }
        Ok(UserId::new(data.claims.sub))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn keys(secret: &str, days: i64) -> TokenKeys {
        TokenKeys::new(&JwtConfig {
            secret: SecretString::from(secret),
            expires_in_days: days,
        })
    }

    #[test]
    fn test_issue_then_verify() {
        let keys = keys("k3y-for-unit-tests-only-0123456789", 30);
        let token = keys.issue(UserId::new(42)).unwrap();
        assert_eq!(keys.verify(&token).unwrap(), UserId::new(42));
    }

    #[test]
    fn test_rejects_other_key() {
        let token = keys("first-key-0123456789-abcdefghijkl", 30)
            .issue(UserId::new(1))
            .unwrap();
        let result = keys("second-key-0123456789-abcdefghijk", 30).verify(&token);
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_rejects_expired() {
        let keys = keys("k3y-for-unit-tests-only-0123456789", -1);
        let token = keys.issue(UserId::new(1)).unwrap();
        assert!(matches!(keys.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_rejects_admin_role() {
        let keys = keys("k3y-for-unit-tests-only-0123456789", 30);
        let claims = Claims {
            sub: 1,
            role: "admin".to_owned(),
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::days(1)).timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding).unwrap();
        assert!(matches!(keys.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_rejects_garbage() {
        let keys = keys("k3y-for-unit-tests-only-0123456789", 30);
        assert!(keys.verify("not.a.token").is_err());
    }
}
