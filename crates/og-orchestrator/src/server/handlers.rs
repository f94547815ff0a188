//! Callback HTTP handlers

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use og_core::api::{ErrorResponse, HealthResponse, OtpSubmission, ReadinessReport, SubmitResponse};
use og_core::error::InboxError;
use og_core::AccountId;

use super::CallbackState;

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// `POST /otp`
pub(super) async fn submit_otp(
    State(state): State<CallbackState>,
    payload: Result<Json<OtpSubmission>, JsonRejection>,
) -> Response {
    let Json(submission) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Rejected malformed OTP submission");
            return error(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    let account_id = match submission.account_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => AccountId::new(id),
        _ => {
            // A single-account deployment may omit the account
            let mut accounts = state.inbox.accounts();
            if accounts.len() != 1 {
                return error(
                    StatusCode::BAD_REQUEST,
                    "account_id is required when more than one account is configured",
                );
            }
            accounts.remove(0)
        }
    };

    match state.inbox.submit(&account_id, &submission.code) {
        Ok(()) => (
            StatusCode::OK,
            Json(SubmitResponse {
                message: "OTP received".to_string(),
                account_id: account_id.to_string(),
            }),
        )
            .into_response(),
        Err(InboxError::EmptyCode) => error(StatusCode::BAD_REQUEST, "OTP is required"),
        Err(e @ InboxError::UnknownAccount(_)) => {
            tracing::warn!(account = %account_id, "OTP submitted for unknown account");
            error(StatusCode::NOT_FOUND, e.to_string())
        }
        Err(e) => error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// `GET /health`
pub(super) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// `GET /readiness`; 503 until every account is authorized
pub(super) async fn readiness(State(state): State<CallbackState>) -> Response {
    let report = ReadinessReport::from_accounts(state.board.snapshot().into_values().collect());
    let status = if report.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report)).into_response()
}
