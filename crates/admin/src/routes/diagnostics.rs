//! Checks that outbound SMS and email work.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::state::AppState;

#[derive(Debug, Serialize)]
struct DiagnosticBody {
    status: bool,
    message: String,
}

fn outcome(result: Result<String, String>) -> impl IntoResponse {
    match result {
        Ok(message) => (
            StatusCode::OK,
            Json(DiagnosticBody {
                status: true,
                message,
            }),
        ),
        Err(error) => {
            error!(%error, "diagnostic send failed");
            (
                StatusCode::NOT_IMPLEMENTED,
                Json(DiagnosticBody {
                    status: false,
                    message: "Error :-/".to_owned(),
                }),
            )
        }
    }
}

/// Send the test SMS to the maintainer phone.
#[instrument(skip(state))]
pub async fn test_sms(State(state): State<AppState>) -> impl IntoResponse {
    let result = state
        .sms()
        .send_test()
        .await
        .map(|phone| {
            info!(%phone, "test SMS sent");
            format!("Test SMS sent to {phone}")
        })
        .map_err(|e| e.to_string());
    outcome(result)
}

/// Send the test email to the configured address.
#[instrument(skip(state))]
pub async fn test_mail(State(state): State<AppState>) -> impl IntoResponse {
    let to = &state.config().test_email;
    let result = state
        .email()
        .send_test(to)
        .await
        .map(|()| {
            info!(to = %to, "test mail sent");
            format!("Test mail sent to {to}")
        })
        .map_err(|e| e.to_string());
    outcome(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_is_501() {
        let response = outcome(Err("boom".to_owned())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    }

    #[test]
    fn test_success_is_200() {
        let response = outcome(Ok("sent".to_owned())).into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
