//! HTTP client for the orchestrator's callback server

use std::time::Duration;

use reqwest::{Client, StatusCode};
use thiserror::Error;

use og_core::api::{
    default_callback_url, ErrorResponse, HealthResponse, OtpSubmission, ReadinessReport,
    SubmitResponse,
};

/// Errors talking to the callback server
#[derive(Error, Debug)]
pub enum CallbackError {
    /// Nothing answered at the address
    #[error("Cannot reach {url}: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with an error body
    #[error("Server rejected the request ({status}): {message}")]
    Rejected { status: StatusCode, message: String },

    /// The server answered with something we cannot read
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),
}

/// Client for `POST /otp`, `GET /health` and `GET /readiness`
pub struct CallbackClient {
    http: Client,
    base_url: String,
}

impl CallbackClient {
    /// Client for the default local address
    pub fn new() -> Result<Self, CallbackError> {
        Self::with_url(default_callback_url())
    }

    /// Client for a custom base URL
    pub fn with_url(base_url: impl Into<String>) -> Result<Self, CallbackError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| CallbackError::InvalidResponse(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Deliver a code. `account_id` may be omitted for single-account setups.
    pub async fn submit(
        &self,
        account_id: Option<&str>,
        code: &str,
    ) -> Result<SubmitResponse, CallbackError> {
        let url = self.url("/otp");
        let body = OtpSubmission {
            account_id: account_id.map(str::to_string),
            code: code.to_string(),
        };
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|source| CallbackError::Unreachable { url, source })?;

        if !response.status().is_success() {
            return Err(rejected(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| CallbackError::InvalidResponse(e.to_string()))
    }

    /// Liveness check
    pub async fn health(&self) -> Result<HealthResponse, CallbackError> {
        let url = self.url("/health");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| CallbackError::Unreachable { url, source })?;

        if !response.status().is_success() {
            return Err(rejected(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| CallbackError::InvalidResponse(e.to_string()))
    }

    /// Readiness report. A 503 still carries a report.
    pub async fn readiness(&self) -> Result<ReadinessReport, CallbackError> {
        let url = self.url("/readiness");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| CallbackError::Unreachable { url, source })?;

        match response.status() {
            status if status.is_success() || status == StatusCode::SERVICE_UNAVAILABLE => response
                .json()
                .await
                .map_err(|e| CallbackError::InvalidResponse(e.to_string())),
            _ => Err(rejected(response).await),
        }
    }
}

async fn rejected(response: reqwest::Response) -> CallbackError {
    let status = response.status();
    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.error,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    };
    CallbackError::Rejected { status, message }
}
