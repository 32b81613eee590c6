//! JSON response envelope: `{ "status": true, "data"?, "message"?, "token"? }`.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Successful response body.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub const fn data(data: T) -> Self {
        Self {
            status: true,
            data: Some(data),
            message: None,
            token: None,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }
}

impl ApiResponse<()> {
    /// A body with only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: true,
            data: None,
            message: Some(message.into()),
            token: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_message_only() {
        let body = serde_json::to_value(ApiResponse::message("Cart cleared.")).unwrap();
        assert_eq!(body, serde_json::json!({"status": true, "message": "Cart cleared."}));
    }

    #[test]
    fn test_data_with_token() {
        let body = serde_json::to_value(ApiResponse::data(vec![1, 2]).with_token("t".to_owned()))
            .unwrap();
        assert_eq!(body, serde_json::json!({"status": true, "data": [1, 2], "token": "t"}));
    }
}
