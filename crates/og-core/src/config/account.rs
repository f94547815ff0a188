//! Per-account configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::resolve_secret;
use crate::error::ConfigError;
use crate::types::AccountId;

/// One statically configured login account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Unique identifier, used as the inbox and readiness key
    pub account_id: String,

    /// Platform application id
    pub api_id: i64,

    /// Platform application key (inline)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Name of an environment variable holding the application key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Phone number the login code is sent to
    pub phone_number: String,

    /// Remote store key; defaults to `<account_id>.session`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,

    /// Local cache file; defaults to `<session_dir>/<account_id>.session`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_session_path: Option<PathBuf>,
}

impl AccountConfig {
    /// Create an account with default key and path derivation
    pub fn new(account_id: impl Into<String>, api_id: i64, phone_number: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            api_id,
            api_key: None,
            api_key_env: None,
            phone_number: phone_number.into(),
            session_key: None,
            local_session_path: None,
        }
    }

    /// Typed account identifier
    pub fn id(&self) -> AccountId {
        AccountId::new(self.account_id.clone())
    }

    /// Key under which the session blob lives in the remote store
    pub fn session_key(&self) -> String {
        self.session_key
            .clone()
            .unwrap_or_else(|| format!("{}.session", self.account_id))
    }

    /// Local cache path, relative paths resolved against `session_dir`
    pub fn local_session_path(&self, session_dir: &Path) -> PathBuf {
        match &self.local_session_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => session_dir.join(path),
            None => session_dir.join(format!("{}.session", self.account_id)),
        }
    }

    /// Resolve the application key from the inline value or the environment
    pub fn api_key(&self) -> Result<String, ConfigError> {
        resolve_secret(
            &format!("accounts.{}.api_key", self.account_id),
            self.api_key.as_deref(),
            self.api_key_env.as_deref(),
        )?
        .ok_or_else(|| ConfigError::MissingField(format!("accounts.{}.api_key", self.account_id)))
    }

    /// Check the fields that do not depend on other accounts
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.account_id.trim().is_empty() {
            return Err(ConfigError::Invalid("account_id must not be empty".to_string()));
        }
        if self.account_id.contains(['/', '\\']) {
            return Err(ConfigError::Invalid(format!(
                "account_id {:?} must not contain path separators",
                self.account_id
            )));
        }
        if self.phone_number.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "accounts.{}.phone_number",
                self.account_id
            )));
        }
        if matches!(&self.session_key, Some(key) if key.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "accounts.{}.session_key must not be empty",
                self.account_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_key_and_path() {
        let account = AccountConfig::new("source", 1, "+15550000001");
        assert_eq!(account.session_key(), "source.session");
        assert_eq!(
            account.local_session_path(Path::new("/var/lib/otpgate")),
            PathBuf::from("/var/lib/otpgate/source.session")
        );
    }

    #[test]
    fn test_relative_local_path_joins_session_dir() {
        let mut account = AccountConfig::new("dest", 1, "+15550000002");
        account.local_session_path = Some(PathBuf::from("custom/dest.bin"));
        assert_eq!(
            account.local_session_path(Path::new("/data")),
            PathBuf::from("/data/custom/dest.bin")
        );

        account.local_session_path = Some(PathBuf::from("/abs/dest.bin"));
        assert_eq!(
            account.local_session_path(Path::new("/data")),
            PathBuf::from("/abs/dest.bin")
        );
    }

    #[test]
    fn test_validate_rejects_empty_id_and_phone() {
        assert!(AccountConfig::new("", 1, "+1").validate().is_err());
        assert!(AccountConfig::new("  ", 1, "+1").validate().is_err());
        assert!(AccountConfig::new("a", 1, "").validate().is_err());
        assert!(AccountConfig::new("a/b", 1, "+1").validate().is_err());
        assert!(AccountConfig::new("a", 1, "+1").validate().is_ok());
    }

    #[test]
    fn test_api_key_inline() {
        let mut account = AccountConfig::new("source", 1, "+1");
        assert!(matches!(account.api_key(), Err(ConfigError::MissingField(_))));
        account.api_key = Some("hash".to_string());
        assert_eq!(account.api_key().unwrap(), "hash");
    }
}
