//! Razorpay order creation and payment signature verification.

use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, instrument};

use strives_core::{MoneyError, to_paise};

const DEFAULT_API_BASE: &str = "https://api.razorpay.com";

/// Orders are always created in rupees.
pub const CURRENCY: &str = "INR";

/// Razorpay API credentials.
#[derive(Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: SecretString,
    /// Overrides the API host (tests, mocks).
    pub api_base: Option<String>,
}

impl std::fmt::Debug for RazorpayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayConfig")
            .field("key_id", &self.key_id)
            .field("key_secret", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Errors from Razorpay calls.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Razorpay returned {status}: {description}")]
    Api { status: u16, description: String },

    #[error("invalid amount: {0}")]
    Amount(#[from] MoneyError),

    #[error("payment signature mismatch")]
    InvalidSignature,
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

/// An order as returned by `POST /v1/orders`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RazorpayOrder {
    pub id: String,
    #[serde(default)]
    pub entity: String,
    /// Amount in paise.
    pub amount: i64,
    #[serde(default)]
    pub amount_paid: i64,
    #[serde(default)]
    pub amount_due: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub attempts: i64,
    #[serde(default)]
    pub created_at: i64,
}

impl RazorpayOrder {
    /// Razorpay marks an order `paid` once a payment for the full amount
    /// is captured.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.status == "paid" && self.amount_paid >= self.amount
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    description: String,
}

/// Razorpay REST client.
#[derive(Clone)]
pub struct RazorpayClient {
    client: Client,
    key_id: String,
    key_secret: SecretString,
    api_base: String,
}

impl std::fmt::Debug for RazorpayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayClient")
            .field("key_id", &self.key_id)
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl RazorpayClient {
    #[must_use]
    pub fn new(config: RazorpayConfig) -> Self {
        Self {
            client: Client::new(),
            key_id: config.key_id,
            key_secret: config.key_secret,
            api_base: config
                .api_base
                .map_or_else(|| DEFAULT_API_BASE.to_owned(), |b| b.trim_end_matches('/').to_owned()),
        }
    }

    /// Public key id, safe to hand to checkout clients.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Create a payment order for `amount` rupees.
    ///
    /// # Errors
    ///
    /// Returns error if the amount is not positive, the request fails,
    /// or Razorpay rejects it.
    #[instrument(skip(self), fields(amount = %amount))]
    pub async fn create_order(
        &self,
        amount: Decimal,
        receipt: &str,
    ) -> Result<RazorpayOrder, PaymentError> {
        let body = CreateOrderRequest {
            amount: to_paise(amount)?,
            currency: CURRENCY,
            receipt,
        };

        let response = self
            .client
            .post(format!("{}/v1/orders", self.api_base))
            .basic_auth(&self.key_id, Some(self.key_secret.expose_secret()))
            .json(&body)
            .send()
            .await?;

        let order = read_order(response).await?;
        debug!(order_id = %order.id, "Razorpay order created");
        Ok(order)
    }

    /// Fetch an order to see what has actually been paid on it.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or Razorpay doesn't know the order.
    #[instrument(skip(self))]
    pub async fn fetch_order(&self, order_id: &str) -> Result<RazorpayOrder, PaymentError> {
        let response = self
            .client
            .get(format!(
                "{}/v1/orders/{}",
                self.api_base,
                urlencoding::encode(order_id)
            ))
            .basic_auth(&self.key_id, Some(self.key_secret.expose_secret()))
            .send()
            .await?;

        let order = read_order(response).await?;
        debug!(order_id = %order.id, status = %order.status, "Razorpay order fetched");
        Ok(order)
    }

    /// Check the checkout signature: HMAC-SHA256 of `order_id|payment_id`
    /// keyed with the key secret, hex encoded.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidSignature` on mismatch.
    #[instrument(skip(self, signature))]
    pub fn verify_payment_signature(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<(), PaymentError> {
        let expected = payment_signature(&self.key_secret, order_id, payment_id)?;
        if !constant_time_compare(&expected, signature.trim()) {
            return Err(PaymentError::InvalidSignature);
        }
        debug!("payment signature verified");
        Ok(())
    }
}

async fn read_order(response: reqwest::Response) -> Result<RazorpayOrder, PaymentError> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let description = serde_json::from_str::<ApiErrorBody>(&text)
            .map(|b| b.error.description)
            .unwrap_or(text);
        return Err(PaymentError::Api {
            status: status.as_u16(),
            description,
        });
    }
    Ok(response.json().await?)
}

/// Compute the signature Razorpay checkout returns for a payment.
///
/// # Errors
///
/// Returns `PaymentError::InvalidSignature` if the key cannot seed the MAC.
pub fn payment_signature(
    key_secret: &SecretString,
    order_id: &str,
    payment_id: &str,
) -> Result<String, PaymentError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key_secret.expose_secret().as_bytes())
        .map_err(|_| PaymentError::InvalidSignature)?;
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ORDER_ID: &str = "order_IluGWxBm9U8zJ8";
    const PAYMENT_ID: &str = "pay_IluGXq2Jq0Lbzl";
    const SIGNATURE: &str = "d8cbceefeb065b2a366c1fd5860ffd04c32a699a299f2bb849b19941a69d45c8";

    fn client() -> RazorpayClient {
        RazorpayClient::new(RazorpayConfig {
            key_id: "rzp_test_123".to_owned(),
            key_secret: SecretString::from("test_key_secret"),
            api_base: None,
        })
    }

    #[test]
    fn test_payment_signature_known_value() {
        let sig =
            payment_signature(&SecretString::from("test_key_secret"), ORDER_ID, PAYMENT_ID).unwrap();
        assert_eq!(sig, SIGNATURE);
    }

    #[test]
    fn test_verify_accepts_valid_signature() {
        assert!(
            client()
                .verify_payment_signature(ORDER_ID, PAYMENT_ID, SIGNATURE)
                .is_ok()
        );
    }

    #[test]
    fn test_verify_rejects_tampered_payment() {
        let result = client().verify_payment_signature(ORDER_ID, "pay_other", SIGNATURE);
        assert!(matches!(result, Err(PaymentError::InvalidSignature)));
        let result = client().verify_payment_signature(ORDER_ID, PAYMENT_ID, "deadbeef");
        assert!(matches!(result, Err(PaymentError::InvalidSignature)));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "ab"));
    }

    #[test]
    fn test_order_request_body() {
        let body = CreateOrderRequest {
            amount: to_paise(Decimal::new(49_950, 2)).unwrap(),
            currency: CURRENCY,
            receipt: "rcpt",
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"amount": 49_950, "currency": "INR", "receipt": "rcpt"})
        );
    }

    #[test]
    fn test_order_response_parses() {
        let order: RazorpayOrder = serde_json::from_str(
            r#"{"id":"order_1","entity":"order","amount":50000,"amount_paid":0,
                "amount_due":50000,"currency":"INR","receipt":"r1","offer_id":null,
                "status":"created","attempts":0,"notes":[],"created_at":1700000000}"#,
        )
        .unwrap();
        assert_eq!(order.id, "order_1");
        assert_eq!(order.amount, 50_000);
        assert_eq!(order.status, "created");
    }

    #[test]
    fn test_only_fully_captured_orders_are_paid() {
        let mut order: RazorpayOrder = serde_json::from_str(
            r#"{"id":"order_2","amount":1000000,"amount_paid":1000000,"amount_due":0,
                "currency":"INR","status":"paid"}"#,
        )
        .unwrap();
        assert!(order.is_paid());

        order.amount_paid = 100;
        assert!(!order.is_paid());

        order.amount_paid = order.amount;
        order.status = "attempted".to_owned();
        assert!(!order.is_paid());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", client());
        assert!(!debug.contains("test_key_secret"));
    }
}
