//! Core error types for otpgate

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::AccountId;

/// Top-level error type for the otpgate ecosystem
#[derive(Error, Debug)]
pub enum OgError {
    /// Session client error
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// Session store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// OTP inbox error
    #[error("Inbox error: {0}")]
    Inbox(#[from] InboxError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Login failure
    #[error("Login failed: {0}")]
    Login(#[from] LoginError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by a [`SessionClient`](crate::traits::SessionClient)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Service-imposed cooldown before another code request is accepted
    #[error("Rate limited, retry after {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    /// The submitted code was wrong or has expired
    #[error("Login code is invalid or expired")]
    InvalidCode,

    /// The account has a two-factor password set
    #[error("Two-factor password required")]
    PasswordRequired,

    /// Transport or protocol failure
    #[error("{0}")]
    Other(String),
}

/// Session store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend could not be reached or answered with an error
    #[error("Session store unavailable: {0}")]
    Unavailable(String),

    /// Key cannot be mapped onto the backend
    #[error("Invalid store key: {0}")]
    InvalidKey(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// OTP inbox errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InboxError {
    /// Submission referenced an account that is not configured
    #[error("Unknown account: {0}")]
    UnknownAccount(AccountId),

    /// Submission carried an empty code
    #[error("OTP code is empty")]
    EmptyCode,

    /// No code arrived before the deadline
    #[error("Timed out waiting for OTP")]
    TimedOut,
}

/// Per-account login failure, attached to the account's readiness entry
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoginError {
    /// The service asked us to wait before requesting another code
    #[error("Rate limited by service, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// The service rejected the OTP
    #[error("OTP was rejected as invalid or expired")]
    InvalidOtp,

    /// No OTP was delivered in time
    #[error("No OTP arrived before the deadline")]
    OtpTimeout,

    /// Password-based second factor is required
    #[error("Account requires a two-factor password, which is not supported")]
    UnsupportedTwoFactor,

    /// Remote persistence failed
    #[error("Session store unavailable: {message}")]
    StoreUnavailable { message: String },

    /// Callback referenced an unconfigured account
    #[error("Unknown account: {account_id}")]
    UnknownAccount { account_id: String },

    /// Connect or transport failure in the session client
    #[error("Session client error: {message}")]
    Client { message: String },

    /// The login task was cancelled before reaching a terminal phase
    #[error("Login cancelled")]
    Cancelled,
}

impl LoginError {
    /// Short machine-readable kind, matching the serialized tag
    pub fn kind(&self) -> &'static str {
        match self {
            LoginError::RateLimited { .. } => "rate_limited",
            LoginError::InvalidOtp => "invalid_otp",
            LoginError::OtpTimeout => "otp_timeout",
            LoginError::UnsupportedTwoFactor => "unsupported_two_factor",
            LoginError::StoreUnavailable { .. } => "store_unavailable",
            LoginError::UnknownAccount { .. } => "unknown_account",
            LoginError::Client { .. } => "client",
            LoginError::Cancelled => "cancelled",
        }
    }

    /// Whether a fresh code request may fix this failure within the same run
    pub fn is_retryable(&self) -> bool {
        matches!(self, LoginError::InvalidOtp)
    }
}

impl From<ClientError> for LoginError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::RateLimited { retry_after } => LoginError::RateLimited {
                retry_after_secs: retry_after.as_secs(),
            },
            ClientError::InvalidCode => LoginError::InvalidOtp,
            ClientError::PasswordRequired => LoginError::UnsupportedTwoFactor,
            ClientError::Other(message) => LoginError::Client { message },
        }
    }
}

impl From<&StoreError> for LoginError {
    fn from(err: &StoreError) -> Self {
        LoginError::StoreUnavailable {
            message: err.to_string(),
        }
    }
}

impl From<InboxError> for LoginError {
    fn from(err: InboxError) -> Self {
        match err {
            InboxError::UnknownAccount(account_id) => LoginError::UnknownAccount {
                account_id: account_id.to_string(),
            },
            InboxError::EmptyCode => LoginError::InvalidOtp,
            InboxError::TimedOut => LoginError::OtpTimeout,
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// A secret was configured via an environment variable that is not set
    #[error("Environment variable {0} is not set")]
    MissingEnv(String),

    /// Two accounts share the same identifier
    #[error("Duplicate account id: {0}")]
    DuplicateAccount(String),
}
