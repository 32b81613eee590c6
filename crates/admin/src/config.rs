//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `ADMIN_JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//! - `S3_BUCKET` - Bucket holding product and collection images
//! - `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` - Credentials for S3 and Pinpoint
//! - `PINPOINT_APPLICATION_ID` - Pinpoint project used for SMS
//! - `SMTP_HOST`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_FROM` - Outgoing mail
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 5002)
//! - `JWT_EXPIRES_IN_DAYS` - Token lifetime (default: 30)
//! - `APP_ENV` - `production` hides error details (default: development)
//! - `S3_REGION` (default: ap-south-1), `S3_ENDPOINT`, `S3_PUBLIC_BASE_URL`
//! - `PINPOINT_*` - See the storefront; the same template ids are used
//! - `MAINTAINER_PHONE` - Receives the test SMS and SMS failure notices
//! - `ADMIN_TEST_EMAIL` - Receives the test mail (default: `SMTP_FROM`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//!
//! ## Optional (TLS)
//! - `ADMIN_TLS_CERT_PATH` - PEM certificate chain file
//! - `ADMIN_TLS_KEY_PATH` - PEM private key file

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use strives_core::Phone;
use strives_integrations::sms::DEFAULT_SENDER_ID;
use strives_integrations::{AwsCredentials, PinpointConfig, S3Config, SmtpConfig};

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

    /// Error bodies carry the internal error chain outside production.
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

/// TLS certificate and key files for HTTPS.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

impl TlsConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let cert = get_optional_env("ADMIN_TLS_CERT_PATH");
        let key = get_optional_env("ADMIN_TLS_KEY_PATH");

        match (cert, key) {
            (Some(cert), Some(key)) => Ok(Some(Self {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "ADMIN_TLS_*".to_string(),
                "Both ADMIN_TLS_CERT_PATH and ADMIN_TLS_KEY_PATH must be set together"
                    .to_string(),
            )),
        }
    }
}

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    pub app_env: AppEnv,
    pub jwt: JwtConfig,
    pub s3: S3Config,
    pub pinpoint: PinpointConfig,
    pub smtp: SmtpConfig,
    /// Recipient of `GET /test/mail`
    pub test_email: String,
    /// TLS configuration for HTTPS (optional)
    pub tls: Option<TlsConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl AdminConfig {
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

        let database_url = get_database_url("ADMIN_DATABASE_URL")?;
        let host = get_env_or_default("ADMIN_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_HOST".to_string(), e.to_string()))?;
        let port = parse_env("ADMIN_PORT", "5002")?;
        let app_env = AppEnv::parse(&get_env_or_default("APP_ENV", "development"));

        let jwt_secret = get_validated_secret("ADMIN_JWT_SECRET")?;
        validate_secret_length(&jwt_secret, "ADMIN_JWT_SECRET")?;
        let jwt = JwtConfig {
            secret: jwt_secret,
            expires_in_days: parse_env("JWT_EXPIRES_IN_DAYS", "30")?,
        };

        let credentials = AwsCredentials {
            access_key_id: get_required_env("AWS_ACCESS_KEY_ID")?,
            secret_access_key: get_required_secret("AWS_SECRET_ACCESS_KEY")?,
        };

        let s3 = S3Config {
            bucket: get_required_env("S3_BUCKET")?,
            region: get_env_or_default("S3_REGION", "ap-south-1"),
            credentials: credentials.clone(),
            endpoint: get_optional_env("S3_ENDPOINT"),
            public_base_url: get_optional_env("S3_PUBLIC_BASE_URL"),
        };

        let maintainer = get_optional_env("MAINTAINER_PHONE")
            .map(|v| {
                Phone::parse(&v).map_err(|e| {
                    ConfigError::InvalidEnvVar("MAINTAINER_PHONE".to_string(), e.to_string())
                })
            })
            .transpose()?;

        let pinpoint = PinpointConfig {
            application_id: get_required_env("PINPOINT_APPLICATION_ID")?,
            region: get_env_or_default("PINPOINT_REGION", "ap-south-1"),
            credentials,
            sender_id: get_env_or_default("PINPOINT_SENDER_ID", DEFAULT_SENDER_ID),
            entity_id: get_optional_env("PINPOINT_ENTITY_ID"),
            otp_template_id: get_optional_env("PINPOINT_OTP_TEMPLATE_ID"),
            order_placed_template_id: get_optional_env("PINPOINT_ORDER_TEMPLATE_ID"),
            maintainer,
            endpoint: get_optional_env("PINPOINT_ENDPOINT"),
        };

        let smtp = SmtpConfig {
            host: get_required_env("SMTP_HOST")?,
            port: parse_env("SMTP_PORT", "587")?,
            username: get_required_env("SMTP_USERNAME")?,
            password: get_required_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("SMTP_FROM")?,
        };
        let test_email =
            get_optional_env("ADMIN_TEST_EMAIL").unwrap_or_else(|| smtp.from_address.clone());

        Ok(Self {
            database_url,
            host,
            port,
            app_env,
            jwt,
            s3,
            pinpoint,
            smtp,
            test_email,
            tls: TlsConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

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

/// Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

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

fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_secret_rejected() {
        let result = validate_secret_strength("changeme-admin-jwt-signing-key-0001", "ADMIN_JWT_SECRET");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_random_secret_accepted() {
        assert!(validate_secret_strength("q8Z!vR2#mT6$wY1^kP4&nD7*sB0@hJ3%", "T").is_ok());
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(validate_secret_length(&SecretString::from("q8Z!vR2#"), "T").is_err());
    }

    #[test]
    fn test_app_env() {
        assert_eq!(AppEnv::parse("Production"), AppEnv::Production);
        assert_eq!(AppEnv::parse("staging"), AppEnv::Development);
        assert_eq!(AppEnv::Production.as_str(), "production");
        assert!(!AppEnv::Production.exposes_error_details());
    }
}
