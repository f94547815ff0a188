//! Core domain types

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::LoginError;

/// Identifier of a configured account, the join key across inbox, store and readiness
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    /// Create a new account ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw ID string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Opaque authenticated-session payload produced by the session client.
///
/// The orchestrator moves these bytes between the local cache and the remote
/// store and never looks inside.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionBlob(Bytes);

impl SessionBlob {
    /// Wrap raw session bytes
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self(data.into())
    }

    /// Borrow the raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume into the underlying buffer
    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the payload is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Short SHA-256 prefix for correlating log lines without exposing content
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(&self.0);
        hex::encode(&digest[..6])
    }
}

impl fmt::Debug for SessionBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionBlob")
            .field("len", &self.0.len())
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

impl From<Vec<u8>> for SessionBlob {
    fn from(data: Vec<u8>) -> Self {
        Self(Bytes::from(data))
    }
}

/// A delivered one-time passcode waiting to be consumed
#[derive(Clone, PartialEq, Eq)]
pub struct OtpEntry {
    /// Account the code belongs to
    pub account_id: AccountId,
    /// The code itself
    pub code: String,
    /// Unix timestamp (ms) when the callback delivered it
    pub received_at_ms: u64,
}

impl fmt::Debug for OtpEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtpEntry")
            .field("account_id", &self.account_id)
            .field("code", &"<redacted>")
            .field("received_at_ms", &self.received_at_ms)
            .finish()
    }
}

/// Login state machine phase for one account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginPhase {
    /// Task not started yet
    Idle,
    /// Looking for a cached session locally or in the remote store
    SessionRestoring,
    /// Asking the service whether the restored session is still valid
    SessionValidating,
    /// Requesting a fresh login code
    CodeRequesting,
    /// Waiting for the callback to deliver the code
    AwaitingOtp,
    /// Submitting the code to the service
    SigningIn,
    /// Logged in; terminal success
    Authorized,
    /// Gave up; terminal failure for this run
    Failed,
}

impl LoginPhase {
    /// Whether no further transitions happen in this run
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoginPhase::Authorized | LoginPhase::Failed)
    }
}

impl fmt::Display for LoginPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoginPhase::Idle => "idle",
            LoginPhase::SessionRestoring => "session_restoring",
            LoginPhase::SessionValidating => "session_validating",
            LoginPhase::CodeRequesting => "code_requesting",
            LoginPhase::AwaitingOtp => "awaiting_otp",
            LoginPhase::SigningIn => "signing_in",
            LoginPhase::Authorized => "authorized",
            LoginPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Read-only snapshot of one account's login progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStatus {
    /// Account identifier
    pub account_id: AccountId,
    /// Current phase
    pub phase: LoginPhase,
    /// Unix timestamp (ms) of the most recent code request
    pub code_requested_at_ms: Option<u64>,
    /// Code requests issued so far in this run
    pub code_attempts: u32,
    /// Most recent error, if any
    pub last_error: Option<LoginError>,
}

impl AccountStatus {
    /// Fresh status for an account that has not started
    pub fn idle(account_id: AccountId) -> Self {
        Self {
            account_id,
            phase: LoginPhase::Idle,
            code_requested_at_ms: None,
            code_attempts: 0,
            last_error: None,
        }
    }

    /// Whether dependents may use this account
    pub fn is_authorized(&self) -> bool {
        self.phase == LoginPhase::Authorized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_terminal() {
        assert!(LoginPhase::Authorized.is_terminal());
        assert!(LoginPhase::Failed.is_terminal());
        assert!(!LoginPhase::AwaitingOtp.is_terminal());
        assert!(!LoginPhase::Idle.is_terminal());
    }

    #[test]
    fn test_phase_display_matches_serde() {
        for phase in [
            LoginPhase::SessionRestoring,
            LoginPhase::AwaitingOtp,
            LoginPhase::Failed,
        ] {
            let json = serde_json::to_string(&phase).unwrap();
            assert_eq!(json, format!("\"{}\"", phase));
        }
    }

    #[test]
    fn test_blob_fingerprint_is_stable_and_short() {
        let a = SessionBlob::new(b"session-bytes".to_vec());
        let b = SessionBlob::from(b"session-bytes".to_vec());
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 12);
        assert_ne!(a.fingerprint(), SessionBlob::new(b"other".to_vec()).fingerprint());
    }

    #[test]
    fn test_otp_entry_debug_redacts_code() {
        let entry = OtpEntry {
            account_id: AccountId::new("source"),
            code: "123456".to_string(),
            received_at_ms: 1,
        };
        let debug = format!("{:?}", entry);
        assert!(!debug.contains("123456"));
        assert!(debug.contains("source"));
    }
}
