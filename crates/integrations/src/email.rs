//! Transactional email over SMTP.
//!
//! Uses lettre for delivery with Askama text and HTML templates.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::instrument;

use strives_core::Email;

use crate::otp::OTP_TTL_MINUTES;

#[derive(Template)]
#[template(path = "email/new_password.html")]
struct NewPasswordHtml<'a> {
    password: &'a str,
}

#[derive(Template)]
#[template(path = "email/new_password.txt")]
struct NewPasswordText<'a> {
    password: &'a str,
}

#[derive(Template)]
#[template(path = "email/otp.html")]
struct OtpHtml<'a> {
    code: &'a str,
    ttl_minutes: i64,
}

#[derive(Template)]
#[template(path = "email/otp.txt")]
struct OtpText<'a> {
    code: &'a str,
    ttl_minutes: i64,
}

#[derive(Template)]
#[template(path = "email/test.html")]
struct TestHtml<'a> {
    sent_at: &'a str,
}

#[derive(Template)]
#[template(path = "email/test.txt")]
struct TestText<'a> {
    sent_at: &'a str,
}

/// SMTP settings.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    /// `From` header, e.g. `The Strives <no-reply@thestrives.com>`.
    pub from_address: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// A rendered email, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: &'static str,
    pub text: String,
    pub html: String,
}

/// Render the "New Password" email.
///
/// # Errors
///
/// Returns error if a template fails to render.
pub fn render_new_password(password: &str) -> Result<RenderedEmail, EmailError> {
    Ok(RenderedEmail {
        subject: "New Password",
        text: NewPasswordText { password }.render()?,
        html: NewPasswordHtml { password }.render()?,
    })
}

/// Render the OTP email.
///
/// # Errors
///
/// Returns error if a template fails to render.
pub fn render_otp(code: &str) -> Result<RenderedEmail, EmailError> {
    let ttl_minutes = OTP_TTL_MINUTES;
    Ok(RenderedEmail {
        subject: "Your The Strives verification code",
        text: OtpText { code, ttl_minutes }.render()?,
        html: OtpHtml { code, ttl_minutes }.render()?,
    })
}

/// Render the admin test mail.
///
/// # Errors
///
/// Returns error if a template fails to render.
pub fn render_test(sent_at: &str) -> Result<RenderedEmail, EmailError> {
    Ok(RenderedEmail {
        subject: "Test Mail",
        text: TestText { sent_at }.render()?,
        html: TestHtml { sent_at }.render()?,
    })
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl std::fmt::Debug for EmailService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailService")
            .field("from_address", &self.from_address)
            .finish_non_exhaustive()
    }
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &SmtpConfig) -> Result<Self, EmailError> {
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Email a freshly generated password.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    #[instrument(skip(self, password), fields(to = %to))]
    pub async fn send_new_password(&self, to: &Email, password: &str) -> Result<(), EmailError> {
        self.send(to.as_str(), &render_new_password(password)?).await
    }

    /// Email a one-time verification code.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    #[instrument(skip(self, code), fields(to = %to))]
    pub async fn send_otp(&self, to: &Email, code: &str) -> Result<(), EmailError> {
        self.send(to.as_str(), &render_otp(code)?).await
    }

    /// Send the diagnostics test mail.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    #[instrument(skip(self))]
    pub async fn send_test(&self, to: &str) -> Result<(), EmailError> {
        let sent_at = chrono::Utc::now().to_rfc2822();
        self.send(to, &render_test(&sent_at)?).await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send(&self, to: &str, email: &RenderedEmail) -> Result<(), EmailError> {
        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(email.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html.clone()),
                    ),
            )?;

        self.mailer.send(message).await?;

        tracing::info!(to = %to, subject = %email.subject, "Email sent successfully");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_password_email() {
        let email = render_new_password("qwerty").unwrap();
        assert_eq!(email.subject, "New Password");
        assert!(email.text.contains("Your new password is: qwerty."));
        assert!(email.html.contains("<strong>qwerty</strong>"));
        assert!(email.text.contains("Thanking You,"));
    }

    #[test]
    fn test_otp_email_mentions_ttl() {
        let email = render_otp("123456").unwrap();
        assert!(email.text.contains("123456"));
        assert!(email.text.contains("10 minutes"));
        assert!(email.html.contains("123456"));
    }

    #[test]
    fn test_html_is_escaped() {
        let email = render_new_password("<b>").unwrap();
        assert!(!email.html.contains("<strong><b></strong>"));
    }

    #[test]
    fn test_config_debug_redacts_password() {
        let config = SmtpConfig {
            host: "smtp.example.com".to_owned(),
            port: 587,
            username: "mailer".to_owned(),
            password: SecretString::from("hunter2"),
            from_address: "The Strives <no-reply@thestrives.com>".to_owned(),
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("REDACTED"));
    }
}
