//! HTTP object-store backed session store
//!
//! Speaks the lowest common denominator of object stores and presigned
//! bucket gateways: `GET`, `PUT`, `HEAD` and `DELETE` on `{base_url}/{key}`,
//! with an optional bearer token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};

use og_core::error::StoreError;
use og_core::traits::SessionStore;
use og_core::SessionBlob;

/// Session store talking to an HTTP object store
pub struct HttpSessionStore {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpSessionStore {
    /// Create a store for `base_url`
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| StoreError::Unavailable(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, key: &str) -> Result<String, StoreError> {
        let key = key.trim_start_matches('/');
        if key.is_empty() || key.split('/').any(|seg| seg == "..") {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(format!("{}/{}", self.base_url, key))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn unavailable(context: &str, err: impl std::fmt::Display) -> StoreError {
    StoreError::Unavailable(format!("{}: {}", context, err))
}

fn unexpected_status(context: &str, status: StatusCode) -> StoreError {
    StoreError::Unavailable(format!("{}: unexpected status {}", context, status))
}

#[async_trait]
impl SessionStore for HttpSessionStore {
    async fn fetch(&self, key: &str) -> Result<Option<SessionBlob>, StoreError> {
        let url = self.url(key)?;
        let response = self
            .authorize(self.http.get(&url))
            .send()
            .await
            .map_err(|e| unavailable("GET failed", e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| unavailable("Failed to read body", e))?;
                Ok(Some(SessionBlob::new(body)))
            }
            status => Err(unexpected_status("GET", status)),
        }
    }

    async fn put(&self, key: &str, blob: &SessionBlob) -> Result<(), StoreError> {
        let url = self.url(key)?;
        let response = self
            .authorize(self.http.put(&url))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(blob.clone().into_bytes())
            .send()
            .await
            .map_err(|e| unavailable("PUT failed", e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(unexpected_status("PUT", response.status()))
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let url = self.url(key)?;
        let response = self
            .authorize(self.http.head(&url))
            .send()
            .await
            .map_err(|e| unavailable("HEAD failed", e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(unexpected_status("HEAD", status)),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let url = self.url(key)?;
        let response = self
            .authorize(self.http.delete(&url))
            .send()
            .await
            .map_err(|e| unavailable("DELETE failed", e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(()),
            status if status.is_success() => Ok(()),
            status => Err(unexpected_status("DELETE", status)),
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
