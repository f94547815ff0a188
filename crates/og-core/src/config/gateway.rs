//! Gateway daemon configuration

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use super::serde_utils::duration_secs;
use super::{resolve_secret, AccountConfig};
use crate::error::ConfigError;

/// Upper bound on code requests per account per run, whatever the config says
pub const MAX_CODE_ATTEMPTS_CAP: u32 = 5;

/// Configuration for the gateway daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Address the OTP callback server binds to
    pub bind_address: String,

    /// Directory holding the local session cache files
    pub session_dir: PathBuf,

    /// Login timing and retry policy
    pub login: LoginConfig,

    /// Remote session store
    pub store: StoreConfig,

    /// Platform login bridge
    pub bridge: BridgeConfig,

    /// Statically configured accounts
    pub accounts: Vec<AccountConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let config_dir = super::default_config_dir();

        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            session_dir: config_dir.join("sessions"),
            login: LoginConfig::default(),
            store: StoreConfig::default(),
            bridge: BridgeConfig::default(),
            accounts: Vec::new(),
        }
    }
}

impl GatewayConfig {
    /// Validate the whole configuration once at startup
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.accounts.is_empty() {
            return Err(ConfigError::MissingField("accounts".to_string()));
        }

        // Every session blob has exactly one writing account
        let mut seen = HashSet::new();
        let mut keys = HashSet::new();
        let mut paths = HashSet::new();
        for account in &self.accounts {
            account.validate()?;
            if !seen.insert(account.account_id.as_str()) {
                return Err(ConfigError::DuplicateAccount(account.account_id.clone()));
            }
            let key = account.session_key();
            if !keys.insert(key.clone()) {
                return Err(ConfigError::Invalid(format!(
                    "accounts.{}.session_key {:?} is already used by another account",
                    account.account_id, key
                )));
            }
            let path = account.local_session_path(&self.session_dir);
            if !paths.insert(path.clone()) {
                return Err(ConfigError::Invalid(format!(
                    "accounts.{}.local_session_path {} is already used by another account",
                    account.account_id,
                    path.display()
                )));
            }
        }

        self.login.validate()?;
        self.store.validate()?;
        Ok(())
    }

    /// Find an account by identifier
    pub fn account(&self, account_id: &str) -> Option<&AccountConfig> {
        self.accounts.iter().find(|a| a.account_id == account_id)
    }
}

/// OTP wait and retry policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginConfig {
    /// How long to wait for the callback to deliver a code
    #[serde(with = "duration_secs")]
    pub otp_timeout: Duration,

    /// Minimum gap between two code requests for the same account
    #[serde(with = "duration_secs")]
    pub code_request_interval: Duration,

    /// Code requests per account per run (invalid codes trigger a new request)
    pub max_code_attempts: u32,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            otp_timeout: Duration::from_secs(60),
            code_request_interval: Duration::from_secs(60),
            max_code_attempts: 3,
        }
    }
}

impl LoginConfig {
    /// Reject a zero OTP timeout and attempt budgets outside `1..=MAX_CODE_ATTEMPTS_CAP`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.otp_timeout.is_zero() {
            return Err(ConfigError::Invalid("login.otp_timeout must be positive".to_string()));
        }
        if self.max_code_attempts == 0 || self.max_code_attempts > MAX_CODE_ATTEMPTS_CAP {
            return Err(ConfigError::Invalid(format!(
                "login.max_code_attempts must be between 1 and {}",
                MAX_CODE_ATTEMPTS_CAP
            )));
        }
        Ok(())
    }
}

/// Remote session store backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Process-local map; sessions do not survive a restart
    Memory,

    /// Directory on a durable (typically mounted) volume
    File {
        /// Store root
        path: PathBuf,
    },

    /// HTTP object store addressed as `{base_url}/{key}`
    Http {
        /// Bucket or prefix URL
        base_url: String,
        /// Bearer token (inline)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
        /// Name of an environment variable holding the bearer token
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token_env: Option<String>,
        /// Per-request timeout
        #[serde(with = "duration_secs", default = "default_store_timeout")]
        request_timeout: Duration,
    },
}

fn default_store_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::File {
            path: super::default_config_dir().join("store"),
        }
    }
}

impl StoreConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            StoreConfig::Memory | StoreConfig::File { .. } => Ok(()),
            StoreConfig::Http { base_url, .. } => {
                if base_url.starts_with("http://") || base_url.starts_with("https://") {
                    Ok(())
                } else {
                    Err(ConfigError::Invalid(format!(
                        "store.base_url must be an http(s) URL, got {:?}",
                        base_url
                    )))
                }
            }
        }
    }

    /// Resolve the bearer token of an HTTP store
    pub fn token(&self) -> Result<Option<String>, ConfigError> {
        match self {
            StoreConfig::Http {
                token, token_env, ..
            } => resolve_secret("store.token", token.as_deref(), token_env.as_deref()),
            _ => Ok(None),
        }
    }
}

/// Platform login bridge endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Base URL of the bridge
    pub base_url: String,

    /// Per-request timeout
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8700".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
bind_address = "127.0.0.1:5001"
session_dir = "/tmp/otpgate"

[login]
otp_timeout = 90
max_code_attempts = 2

[store]
kind = "http"
base_url = "https://objects.example.com/sessions"
token = "secret"

[[accounts]]
account_id = "source"
api_id = 12345
api_key = "abc"
phone_number = "+15550000001"

[[accounts]]
account_id = "dest"
api_id = 12345
api_key_env = "DEST_API_KEY"
phone_number = "+15550000002"
session_key = "sessions/dest.session"
"#;

    #[test]
    fn test_parse_sample() {
        let config: GatewayConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.bind_address, "127.0.0.1:5001");
        assert_eq!(config.login.otp_timeout, Duration::from_secs(90));
        // Unspecified fields fall back to defaults
        assert_eq!(config.login.code_request_interval, Duration::from_secs(60));
        assert_eq!(config.login.max_code_attempts, 2);
        assert_eq!(config.accounts.len(), 2);
        assert_eq!(config.accounts[1].session_key(), "sessions/dest.session");
        assert_eq!(config.store.token().unwrap().as_deref(), Some("secret"));
        match &config.store {
            StoreConfig::Http {
                request_timeout, ..
            } => assert_eq!(*request_timeout, Duration::from_secs(30)),
            other => panic!("unexpected store config: {:?}", other),
        }
        config.validate().unwrap();
    }

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.login.otp_timeout, Duration::from_secs(60));
        assert_eq!(config.login.max_code_attempts, 3);
        assert!(matches!(config.store, StoreConfig::File { .. }));
    }

    #[test]
    fn test_validate_requires_accounts() {
        let err = GatewayConfig::default().validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn test_validate_rejects_duplicate_accounts() {
        let mut config = GatewayConfig::default();
        config.accounts.push(AccountConfig::new("source", 1, "+1"));
        config.accounts.push(AccountConfig::new("source", 2, "+2"));
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateAccount(id) if id == "source"));
    }

    #[test]
    fn test_validate_caps_code_attempts() {
        let mut config = GatewayConfig::default();
        config.accounts.push(AccountConfig::new("source", 1, "+1"));
        config.login.max_code_attempts = MAX_CODE_ATTEMPTS_CAP + 1;
        assert!(config.validate().is_err());
        config.login.max_code_attempts = 0;
        assert!(config.validate().is_err());
        config.login.max_code_attempts = MAX_CODE_ATTEMPTS_CAP;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_shared_session_key() {
        let mut config = GatewayConfig::default();
        let mut a = AccountConfig::new("a", 1, "+1");
        a.session_key = Some("shared.session".to_string());
        let mut b = AccountConfig::new("b", 1, "+2");
        b.session_key = Some("shared.session".to_string());
        config.accounts = vec![a, b];

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("accounts.b.session_key")));
    }

    #[test]
    fn test_validate_rejects_shared_local_session_path() {
        let mut config = GatewayConfig::default();
        config.session_dir = PathBuf::from("/data/sessions");
        let a = AccountConfig::new("a", 1, "+1");
        let mut b = AccountConfig::new("b", 1, "+2");
        b.local_session_path = Some(PathBuf::from("a.session"));
        config.accounts = vec![a, b.clone()];

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("accounts.b.local_session_path")));

        // The same file named by absolute path collides too
        b.local_session_path = Some(PathBuf::from("/data/sessions/a.session"));
        config.accounts[1] = b;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_login_config_rejects_zero_timeout() {
        let login = LoginConfig {
            otp_timeout: Duration::ZERO,
            ..LoginConfig::default()
        };
        assert!(matches!(login.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_non_http_store_url() {
        let mut config = GatewayConfig::default();
        config.accounts.push(AccountConfig::new("source", 1, "+1"));
        config.store = StoreConfig::Http {
            base_url: "ftp://nope".to_string(),
            token: None,
            token_env: None,
            request_timeout: Duration::from_secs(5),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_memory_store_kind() {
        let config: GatewayConfig = toml::from_str("[store]\nkind = \"memory\"\n").unwrap();
        assert!(matches!(config.store, StoreConfig::Memory));
    }
}
