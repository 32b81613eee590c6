//! Transactional SMS through the Amazon Pinpoint `SendMessages` API.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, instrument, warn};
use url::Url;

use strives_core::Phone;

use crate::aws::{AwsCredentials, SigV4Signer, sha256_hex};
use crate::messages::{self, DltTemplate, SmsMessage};

/// Registered sender id.
pub const DEFAULT_SENDER_ID: &str = "STRVES";

/// Pinpoint application and DLT registration settings.
#[derive(Debug, Clone)]
pub struct PinpointConfig {
    pub application_id: String,
    pub region: String,
    pub credentials: AwsCredentials,
    pub sender_id: String,
    pub entity_id: Option<String>,
    pub otp_template_id: Option<String>,
    pub order_placed_template_id: Option<String>,
    /// Receives an error notification when a send fails.
    pub maintainer: Option<Phone>,
    /// Overrides `https://pinpoint.{region}.amazonaws.com`.
    pub endpoint: Option<String>,
}

/// Errors from SMS delivery.
#[derive(Debug, Error)]
pub enum SmsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Pinpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("delivery to {destination} failed: {status}")]
    Rejected { destination: String, status: String },

    #[error("invalid Pinpoint URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("no maintainer phone configured")]
    NoMaintainer,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendMessagesRequest<'a> {
    message_request: MessageRequest<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct MessageRequest<'a> {
    addresses: BTreeMap<&'a str, AddressConfiguration>,
    message_configuration: MessageConfiguration<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct AddressConfiguration {
    channel_type: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct MessageConfiguration<'a> {
    #[serde(rename = "SMSMessage")]
    sms_message: SmsPayload<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SmsPayload<'a> {
    body: &'a str,
    message_type: &'static str,
    sender_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    entity_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    template_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SendMessagesResponse {
    message_response: MessageResponse,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MessageResponse {
    #[serde(default)]
    result: HashMap<String, MessageResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MessageResult {
    delivery_status: String,
    #[serde(default)]
    status_message: Option<String>,
}

/// Pinpoint SMS client.
#[derive(Debug, Clone)]
pub struct SmsClient {
    client: Client,
    signer: SigV4Signer,
    url: Url,
    sender_id: String,
    entity_id: Option<String>,
    otp_template_id: Option<String>,
    order_placed_template_id: Option<String>,
    maintainer: Option<Phone>,
}

impl SmsClient {
    /// Build a client for one Pinpoint application.
    ///
    /// # Errors
    ///
    /// Returns `SmsError::Url` if the endpoint is not a valid URL.
    pub fn new(config: PinpointConfig) -> Result<Self, SmsError> {
        let endpoint = config
            .endpoint
            .unwrap_or_else(|| format!("https://pinpoint.{}.amazonaws.com", config.region));
        let url = Url::parse(&format!(
            "{}/v1/apps/{}/messages",
            endpoint.trim_end_matches('/'),
            config.application_id
        ))?;

        Ok(Self {
            client: Client::new(),
            signer: SigV4Signer::new(config.credentials, config.region, "mobiletargeting"),
            url,
            sender_id: config.sender_id,
            entity_id: config.entity_id,
            otp_template_id: config.otp_template_id,
            order_placed_template_id: config.order_placed_template_id,
            maintainer: config.maintainer,
        })
    }

    fn template_id(&self, template: Option<DltTemplate>) -> Option<&str> {
        match template? {
            DltTemplate::Otp => self.otp_template_id.as_deref(),
            DltTemplate::OrderPlaced => self.order_placed_template_id.as_deref(),
        }
    }

    fn request_body(&self, to: &[Phone], message: &SmsMessage) -> Result<Vec<u8>, SmsError> {
        let addresses = to
            .iter()
            .map(|p| (p.as_str(), AddressConfiguration { channel_type: "SMS" }))
            .collect();
        let request = SendMessagesRequest {
            message_request: MessageRequest {
                addresses,
                message_configuration: MessageConfiguration {
                    sms_message: SmsPayload {
                        body: &message.body,
                        message_type: "TRANSACTIONAL",
                        sender_id: &self.sender_id,
                        entity_id: self.entity_id.as_deref(),
                        template_id: self.template_id(message.template),
                    },
                },
            },
        };
        Ok(serde_json::to_vec(&request)?)
    }

    /// Send one message to every destination.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or any destination is not
    /// accepted for delivery.
    #[instrument(skip(self, message), fields(recipients = to.len()))]
    pub async fn send(&self, to: &[Phone], message: &SmsMessage) -> Result<(), SmsError> {
        if to.is_empty() {
            return Ok(());
        }

        let body = self.request_body(to, message)?;
        let payload_hash = sha256_hex(&body);
        let mut headers = vec![("content-type".to_owned(), "application/json".to_owned())];
        self.signer
            .sign("POST", &self.url, &mut headers, &payload_hash, Utc::now());

        let mut request = self.client.post(self.url.clone());
        for (name, value) in &headers {
            if name != "host" {
                request = request.header(name, value);
            }
        }

        let response = request.body(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SmsError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SendMessagesResponse = response.json().await?;
        for (destination, result) in parsed.message_response.result {
            if result.delivery_status != "SUCCESSFUL" {
                return Err(SmsError::Rejected {
                    destination,
                    status: result
                        .status_message
                        .unwrap_or(result.delivery_status),
                });
            }
        }

        debug!("SMS accepted");
        Ok(())
    }

    /// Send, and on failure tell the maintainer about it.
    ///
    /// The original error is returned either way.
    ///
    /// # Errors
    ///
    /// Returns the error from [`Self::send`].
    pub async fn send_reporting(
        &self,
        to: &[Phone],
        message: &SmsMessage,
        topic: &str,
    ) -> Result<(), SmsError> {
        let Err(e) = self.send(to, message).await else {
            return Ok(());
        };
        error!(error = %e, topic, "SMS send failed");

        if let Some(maintainer) = &self.maintainer {
            let notice = messages::error_notification(topic, &e.to_string());
            if let Err(report_err) = self.send(std::slice::from_ref(maintainer), &notice).await {
                warn!(error = %report_err, "failed to notify maintainer");
            }
        }
        Err(e)
    }

    /// Send the test message to the maintainer.
    ///
    /// # Errors
    ///
    /// Returns `SmsError::NoMaintainer` when no maintainer phone is set,
    /// otherwise the error from [`Self::send`].
    pub async fn send_test(&self) -> Result<&Phone, SmsError> {
        let maintainer = self.maintainer.as_ref().ok_or(SmsError::NoMaintainer)?;
        self.send(std::slice::from_ref(maintainer), &messages::test_message())
            .await?;
        Ok(maintainer)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn client() -> SmsClient {
        SmsClient::new(PinpointConfig {
            application_id: "app123".to_owned(),
            region: "ap-south-1".to_owned(),
            credentials: AwsCredentials {
                access_key_id: "AKIDEXAMPLE".to_owned(),
                secret_access_key: SecretString::from("secret"),
            },
            sender_id: DEFAULT_SENDER_ID.to_owned(),
            entity_id: Some("110135350000049663".to_owned()),
            otp_template_id: Some("1107161701552665238".to_owned()),
            order_placed_template_id: Some("1107161701563048828".to_owned()),
            maintainer: None,
            endpoint: None,
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_url() {
        assert_eq!(
            client().url.as_str(),
            "https://pinpoint.ap-south-1.amazonaws.com/v1/apps/app123/messages"
        );
    }

    #[test]
    fn test_registered_message_body() {
        let to = [Phone::parse("9876543210").unwrap()];
        let body = client().request_body(&to, &messages::otp("123456")).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let request = &json["MessageRequest"];
        assert_eq!(request["Addresses"]["+919876543210"]["ChannelType"], "SMS");
        let sms = &request["MessageConfiguration"]["SMSMessage"];
        assert_eq!(sms["MessageType"], "TRANSACTIONAL");
        assert_eq!(sms["SenderId"], "STRVES");
        assert_eq!(sms["EntityId"], "110135350000049663");
        assert_eq!(sms["TemplateId"], "1107161701552665238");
    }

    #[test]
    fn test_plain_message_has_no_template() {
        let to = [Phone::parse("9876543210").unwrap()];
        let msg = messages::error_notification("x", "y");
        let body = client().request_body(&to, &msg).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let sms = &json["MessageRequest"]["MessageConfiguration"]["SMSMessage"];
        assert!(sms.get("TemplateId").is_none());
    }

    #[test]
    fn test_response_parsing() {
        let parsed: SendMessagesResponse = serde_json::from_str(
            r#"{"MessageResponse":{"ApplicationId":"app123","Result":{
                "+919876543210":{"DeliveryStatus":"PERMANENT_FAILURE","StatusCode":400,
                "StatusMessage":"Invalid number"}}}}"#,
        )
        .unwrap();
        let result = parsed.message_response.result.get("+919876543210").unwrap();
        assert_eq!(result.delivery_status, "PERMANENT_FAILURE");
        assert_eq!(result.status_message.as_deref(), Some("Invalid number"));
    }

    #[tokio::test]
    async fn test_send_to_nobody_is_a_no_op() {
        assert!(client().send(&[], &messages::otp("1")).await.is_ok());
    }
}
