//! HTTP API between the callback server and its clients
//!
//! JSON bodies for `POST /otp`, `GET /health` and `GET /readiness`. The
//! daemon and the `otpgate` CLI both use these types.

use serde::{Deserialize, Serialize};

use crate::types::AccountStatus;

/// Default port of the callback server
pub const DEFAULT_CALLBACK_PORT: u16 = 5000;

/// Default callback address used by the CLI
pub fn default_callback_url() -> String {
    format!("http://127.0.0.1:{}", DEFAULT_CALLBACK_PORT)
}

/// OTP delivery payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OtpSubmission {
    /// Target account; may be omitted when exactly one account is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,

    /// The delivered code (`otp` accepted for older senders)
    #[serde(default, alias = "otp")]
    pub code: String,
}

/// Successful submission acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    /// Human-readable message
    pub message: String,
    /// Account the code was queued for
    pub account_id: String,
}

/// Error body for any rejected request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Description of the failure
    pub error: String,
}

/// Liveness body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"healthy"` while the server answers
    pub status: String,
}

/// Readiness snapshot of every configured account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessReport {
    /// True when every account is authorized
    pub ready: bool,
    /// Per-account status, ordered by account id
    pub accounts: Vec<AccountStatus>,
}

impl ReadinessReport {
    /// Build a report from account snapshots
    pub fn from_accounts(accounts: Vec<AccountStatus>) -> Self {
        let ready = !accounts.is_empty() && accounts.iter().all(AccountStatus::is_authorized);
        Self { ready, accounts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountId, LoginPhase};

    #[test]
    fn test_submission_accepts_legacy_otp_field() {
        let sub: OtpSubmission = serde_json::from_str(r#"{"otp":"123456"}"#).unwrap();
        assert_eq!(sub.code, "123456");
        assert!(sub.account_id.is_none());

        let sub: OtpSubmission =
            serde_json::from_str(r#"{"account_id":"source","code":"654321"}"#).unwrap();
        assert_eq!(sub.account_id.as_deref(), Some("source"));
        assert_eq!(sub.code, "654321");
    }

    #[test]
    fn test_submission_missing_code_is_empty() {
        let sub: OtpSubmission = serde_json::from_str(r#"{"account_id":"source"}"#).unwrap();
        assert!(sub.code.is_empty());
    }

    #[test]
    fn test_readiness_requires_every_account() {
        let mut a = AccountStatus::idle(AccountId::new("a"));
        let mut b = AccountStatus::idle(AccountId::new("b"));
        a.phase = LoginPhase::Authorized;
        assert!(!ReadinessReport::from_accounts(vec![a.clone(), b.clone()]).ready);

        b.phase = LoginPhase::Authorized;
        assert!(ReadinessReport::from_accounts(vec![a, b]).ready);
        assert!(!ReadinessReport::from_accounts(vec![]).ready);
    }
}
