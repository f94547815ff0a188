//! HTTP login bridge client
//!
//! [`SessionClient`] implementation that talks to a sidecar owning the
//! messaging platform's client library. The bridge exposes a small JSON API:
//!
//! | Request                                   | Response              |
//! |-------------------------------------------|-----------------------|
//! | `POST /v1/connect`                        | `{connection_id}`     |
//! | `POST /v1/connections/{id}/authorized`    | `{authorized}`        |
//! | `POST /v1/connections/{id}/send_code`     | empty                 |
//! | `POST /v1/connections/{id}/sign_in`       | `{session}` (base64)  |
//!
//! Errors come back as `{error, retry_after_secs?}` using the platform's RPC
//! error names. Session bytes travel base64 encoded and are mirrored into the
//! account's local cache file.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use og_core::config::{AccountConfig, BridgeConfig};
use og_core::error::{ClientError, OgError};
use og_core::traits::SessionClient;
use og_core::{AccountId, SessionBlob};

use crate::cache::LocalSessionCache;

#[derive(Serialize)]
struct ConnectRequest<'a> {
    account_id: &'a str,
    api_id: i64,
    api_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<String>,
}

#[derive(Deserialize)]
struct ConnectResponse {
    connection_id: String,
}

#[derive(Deserialize)]
struct AuthorizedResponse {
    authorized: bool,
}

#[derive(Serialize)]
struct SendCodeRequest<'a> {
    phone: &'a str,
}

#[derive(Serialize)]
struct SignInRequest<'a> {
    phone: &'a str,
    code: &'a str,
}

#[derive(Deserialize)]
struct SignInResponse {
    session: String,
}

/// Error body returned by the bridge
#[derive(Debug, Default, Deserialize)]
struct BridgeErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    retry_after_secs: Option<u64>,
}

/// Map a failed bridge response onto the client error kinds
fn classify(status: StatusCode, retry_after_header: Option<u64>, body: &BridgeErrorBody) -> ClientError {
    let name = body.error.as_str();

    if name.starts_with("PHONE_CODE_") {
        return ClientError::InvalidCode;
    }
    if name == "SESSION_PASSWORD_NEEDED" {
        return ClientError::PasswordRequired;
    }

    let flood_secs = name
        .strip_prefix("FLOOD_WAIT_")
        .and_then(|secs| secs.parse::<u64>().ok());
    if status == StatusCode::TOO_MANY_REQUESTS || flood_secs.is_some() {
        let secs = body
            .retry_after_secs
            .or(flood_secs)
            .or(retry_after_header)
            .unwrap_or(0);
        return ClientError::RateLimited {
            retry_after: Duration::from_secs(secs),
        };
    }

    if name.is_empty() {
        ClientError::Other(format!("bridge returned {}", status))
    } else {
        ClientError::Other(format!("bridge returned {}: {}", status, name))
    }
}

/// Session client backed by the HTTP login bridge
pub struct BridgeSessionClient {
    http: Client,
    base_url: String,
    account_id: AccountId,
    api_id: i64,
    api_key: String,
    cache: LocalSessionCache,
    connection_id: Option<String>,
}

impl BridgeSessionClient {
    /// Client for one account. Resolves the account's API key.
    pub fn new(
        bridge: &BridgeConfig,
        account: &AccountConfig,
        session_dir: &Path,
    ) -> Result<Self, OgError> {
        let http = Client::builder()
            .timeout(bridge.request_timeout)
            .build()
            .map_err(|e| ClientError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: bridge.base_url.trim_end_matches('/').to_string(),
            account_id: account.id(),
            api_id: account.api_id,
            api_key: account.api_key()?,
            cache: LocalSessionCache::new(account.local_session_path(session_dir)),
            connection_id: None,
        })
    }

    fn connection(&self) -> Result<&str, ClientError> {
        self.connection_id
            .as_deref()
            .ok_or_else(|| ClientError::Other("not connected to the login bridge".to_string()))
    }

    /// POST a JSON body; non-2xx responses become classified errors
    async fn send<Req>(&self, path: &str, body: &Req) -> Result<reqwest::Response, ClientError>
    where
        Req: Serialize + ?Sized + Sync,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ClientError::Other(format!("bridge request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let error_body = response.json::<BridgeErrorBody>().await.unwrap_or_default();
        tracing::debug!(%status, error = %error_body.error, "Login bridge rejected {}", path);
        Err(classify(status, retry_after, &error_body))
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, ClientError>
    where
        Req: Serialize + ?Sized + Sync,
        Resp: DeserializeOwned,
    {
        self.send(path, body)
            .await?
            .json::<Resp>()
            .await
            .map_err(|e| ClientError::Other(format!("invalid bridge response: {}", e)))
    }
}

#[async_trait]
impl SessionClient for BridgeSessionClient {
    async fn connect(&mut self) -> Result<(), ClientError> {
        let session = self
            .cache
            .load()
            .await
            .map_err(|e| ClientError::Other(format!("failed to read local session: {}", e)))?
            .map(|blob| STANDARD.encode(blob.as_bytes()));

        let request = ConnectRequest {
            account_id: self.account_id.as_str(),
            api_id: self.api_id,
            api_key: &self.api_key,
            session,
        };
        let response: ConnectResponse = self.post("/v1/connect", &request).await?;

        tracing::debug!(connection = %response.connection_id, "Connected to login bridge");
        self.connection_id = Some(response.connection_id);
        Ok(())
    }

    async fn is_authorized(&mut self) -> Result<bool, ClientError> {
        let path = format!("/v1/connections/{}/authorized", self.connection()?);
        let response: AuthorizedResponse = self.post(&path, &serde_json::json!({})).await?;
        Ok(response.authorized)
    }

    async fn request_code(&mut self, phone: &str) -> Result<(), ClientError> {
        let path = format!("/v1/connections/{}/send_code", self.connection()?);
        self.send(&path, &SendCodeRequest { phone }).await?;
        Ok(())
    }

    async fn sign_in(&mut self, phone: &str, code: &str) -> Result<(), ClientError> {
        let path = format!("/v1/connections/{}/sign_in", self.connection()?);
        let response: SignInResponse = self.post(&path, &SignInRequest { phone, code }).await?;

        let bytes = STANDARD
            .decode(response.session.trim())
            .map_err(|e| ClientError::Other(format!("bridge returned an undecodable session: {}", e)))?;
        let blob = SessionBlob::from(bytes);
        self.cache
            .save(&blob)
            .await
            .map_err(|e| ClientError::Other(format!("failed to write local session: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(error: &str) -> BridgeErrorBody {
        BridgeErrorBody {
            error: error.to_string(),
            retry_after_secs: None,
        }
    }

    #[test]
    fn test_classify_code_errors() {
        for name in ["PHONE_CODE_INVALID", "PHONE_CODE_EXPIRED"] {
            assert_eq!(
                classify(StatusCode::BAD_REQUEST, None, &body(name)),
                ClientError::InvalidCode
            );
        }
        assert_eq!(
            classify(StatusCode::UNAUTHORIZED, None, &body("SESSION_PASSWORD_NEEDED")),
            ClientError::PasswordRequired
        );
    }

    #[test]
    fn test_classify_rate_limits() {
        let from_body = BridgeErrorBody {
            error: "FLOOD_WAIT".to_string(),
            retry_after_secs: Some(30),
        };
        assert_eq!(
            classify(StatusCode::TOO_MANY_REQUESTS, Some(5), &from_body),
            ClientError::RateLimited {
                retry_after: Duration::from_secs(30)
            }
        );
        assert_eq!(
            classify(StatusCode::BAD_REQUEST, None, &body("FLOOD_WAIT_42")),
            ClientError::RateLimited {
                retry_after: Duration::from_secs(42)
            }
        );
        assert_eq!(
            classify(StatusCode::TOO_MANY_REQUESTS, Some(7), &body("")),
            ClientError::RateLimited {
                retry_after: Duration::from_secs(7)
            }
        );
    }

    #[test]
    fn test_classify_other() {
        let err = classify(StatusCode::BAD_GATEWAY, None, &body(""));
        assert!(matches!(err, ClientError::Other(msg) if msg.contains("502")));
    }

    #[tokio::test]
    async fn test_calls_before_connect_fail() {
        let dir = tempfile::tempdir().unwrap();
        let mut account = AccountConfig::new("source", 1, "+10000000000");
        account.api_key = Some("key".to_string());
        let mut client =
            BridgeSessionClient::new(&BridgeConfig::default(), &account, dir.path()).unwrap();

        let err = client.request_code("+10000000000").await.unwrap_err();
        assert!(matches!(err, ClientError::Other(_)));
    }
}
