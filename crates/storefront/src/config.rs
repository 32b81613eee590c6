//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//! - `RAZORPAY_KEY_ID` / `RAZORPAY_KEY_SECRET` - Razorpay API credentials
//! - `PINPOINT_APPLICATION_ID` - Pinpoint project used for SMS
//! - `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` - Credentials for Pinpoint
//! - `SMTP_HOST`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_FROM` - Outgoing mail
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 5001)
//! - `JWT_EXPIRES_IN_DAYS` - Token lifetime (default: 30)
//! - `APP_ENV` - `production` hides error details (default: development)
//! - `PINPOINT_REGION` (default: ap-south-1), `PINPOINT_SENDER_ID` (default: STRVES),
//!   `PINPOINT_ENTITY_ID`, `PINPOINT_OTP_TEMPLATE_ID`, `PINPOINT_ORDER_TEMPLATE_ID`,
//!   `PINPOINT_ENDPOINT`
//! - `SMTP_PORT` - SMTP port (default: 587)
//! - `ADMIN_PHONES` - Comma-separated phones notified of new orders
//! - `MAINTAINER_PHONE` - Phone notified when an SMS fails
//! - `ORDER_LINK_BASE` - Prefix of order links in SMS (default: www.thestrives.com/order)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use strives_core::Phone;
use strives_integrations::{AwsCredentials, PinpointConfig, RazorpayConfig, SmtpConfig};
use strives_integrations::sms::DEFAULT_SENDER_ID;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppEnv {
    #[default]
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("production") {
            Self::Production
        } else {
            Self::Development
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }

    /// Whether error responses may carry the internal error chain.
    #[must_use]
    pub const fn exposes_error_details(self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Token signing settings.
#[derive(Clone)]
pub struct JwtConfig {
    pub secret: SecretString,
    pub expires_in_days: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("expires_in_days", &self.expires_in_days)
            .finish()
    }
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    pub app_env: AppEnv,
    pub jwt: JwtConfig,
    pub razorpay: RazorpayConfig,
    pub pinpoint: PinpointConfig,
    pub smtp: SmtpConfig,
    /// Phones told about every new order
    pub admin_phones: Vec<Phone>,
    /// Prefix of the order link sent to customers
    pub order_link_base: String,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = parse_env("STOREFRONT_PORT", "5001")?;
        let app_env = AppEnv::parse(&get_env_or_default("APP_ENV", "development"));

        let jwt_secret = get_validated_secret("STOREFRONT_JWT_SECRET")?;
        validate_secret_length(&jwt_secret, "STOREFRONT_JWT_SECRET")?;
        let jwt = JwtConfig {
            secret: jwt_secret,
            expires_in_days: parse_env("JWT_EXPIRES_IN_DAYS", "30")?,
        };

        let razorpay = RazorpayConfig {
            key_id: get_required_env("RAZORPAY_KEY_ID")?,
            key_secret: get_required_secret("RAZORPAY_KEY_SECRET")?,
            api_base: get_optional_env("RAZORPAY_API_BASE"),
        };

        let maintainer = get_optional_env("MAINTAINER_PHONE")
            .map(|v| parse_phone("MAINTAINER_PHONE", &v))
            .transpose()?;
        let pinpoint = pinpoint_from_env(maintainer)?;
        let smtp = smtp_from_env()?;

        let admin_phones = get_optional_env("ADMIN_PHONES")
            .map(|v| parse_phone_list("ADMIN_PHONES", &v))
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            database_url,
            host,
            port,
            app_env,
            jwt,
            razorpay,
            pinpoint,
            smtp,
            admin_phones,
            order_link_base: get_env_or_default("ORDER_LINK_BASE", "www.thestrives.com/order"),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn pinpoint_from_env(maintainer: Option<Phone>) -> Result<PinpointConfig, ConfigError> {
    Ok(PinpointConfig {
        application_id: get_required_env("PINPOINT_APPLICATION_ID")?,
        region: get_env_or_default("PINPOINT_REGION", "ap-south-1"),
        credentials: AwsCredentials {
            access_key_id: get_required_env("AWS_ACCESS_KEY_ID")?,
            secret_access_key: get_required_secret("AWS_SECRET_ACCESS_KEY")?,
        },
        sender_id: get_env_or_default("PINPOINT_SENDER_ID", DEFAULT_SENDER_ID),
        entity_id: get_optional_env("PINPOINT_ENTITY_ID"),
        otp_template_id: get_optional_env("PINPOINT_OTP_TEMPLATE_ID"),
        order_placed_template_id: get_optional_env("PINPOINT_ORDER_TEMPLATE_ID"),
        maintainer,
        endpoint: get_optional_env("PINPOINT_ENDPOINT"),
    })
}

fn smtp_from_env() -> Result<SmtpConfig, ConfigError> {
    Ok(SmtpConfig {
        host: get_required_env("SMTP_HOST")?,
        port: parse_env("SMTP_PORT", "587")?,
        username: get_required_env("SMTP_USERNAME")?,
        password: get_required_secret("SMTP_PASSWORD")?,
        from_address: get_required_env("SMTP_FROM")?,
    })
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_phone(key: &str, value: &str) -> Result<Phone, ConfigError> {
    Phone::parse(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_phone_list(key: &str, value: &str) -> Result<Vec<Phone>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_phone(key, s))
        .collect()
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-jwt-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_secret_length() {
        assert!(validate_secret_length(&SecretString::from("short"), "T").is_err());
        assert!(validate_secret_length(&SecretString::from("a".repeat(32)), "T").is_ok());
    }

    #[test]
    fn test_app_env_parsing() {
        assert_eq!(AppEnv::parse("production"), AppEnv::Production);
        assert_eq!(AppEnv::parse("PRODUCTION"), AppEnv::Production);
        assert_eq!(AppEnv::parse("staging"), AppEnv::Development);
        assert!(!AppEnv::Production.exposes_error_details());
        assert!(AppEnv::Development.exposes_error_details());
    }

    #[test]
    fn test_phone_list() {
        let phones = parse_phone_list("ADMIN_PHONES", "9876543210, +919812345678,").unwrap();
        assert_eq!(phones.len(), 2);
        assert_eq!(phones[0].as_str(), "+919876543210");
        assert!(parse_phone_list("ADMIN_PHONES", "12").is_err());
    }

    #[test]
    fn test_jwt_config_debug_redacts_secret() {
        let config = JwtConfig {
            secret: SecretString::from("super_secret_signing_key"),
            expires_in_days: 30,
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_signing_key"));
    }
}
