//! JSON response envelope: `{ "status": true, "data"?, "message"?, "token"? }`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Successful response body.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip)]
    code: StatusCode,
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
            code: StatusCode::OK,
            status: true,
            data: Some(data),
            message: None,
            token: None,
        }
    }

    /// A 201 response carrying the new entity.
    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::CREATED,
            ..Self::data(data).with_message(message)
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
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::OK,
            status: true,
            data: None,
            message: Some(message.into()),
            token: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.code, Json(self)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_created_is_201() {
        let response = ApiResponse::created(1, "Tag Added Successfully").into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[test]
    fn test_status_code_not_serialized() {
        let body = serde_json::to_value(ApiResponse::message("Deleted")).unwrap();
        assert_eq!(body, serde_json::json!({"status": true, "message": "Deleted"}));
    }
}
