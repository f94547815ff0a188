//! Configuration management for otpgate

mod account;
mod gateway;
pub mod serde_utils;

pub use account::AccountConfig;
pub use gateway::{BridgeConfig, GatewayConfig, LoginConfig, StoreConfig, MAX_CODE_ATTEMPTS_CAP};

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Get the default configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("otpgate")
}

/// Get the default configuration file path
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Load configuration from a file
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read config: {}", e)))?;

    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to a file
pub fn save_config<T: serde::Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ConfigError::Invalid(format!("Failed to create config dir: {}", e)))?;
    }

    std::fs::write(path, content)
        .map_err(|e| ConfigError::Invalid(format!("Failed to write config: {}", e)))?;

    Ok(())
}

/// Resolve a secret given either inline or by environment variable name.
///
/// The inline value wins when both are set.
pub(crate) fn resolve_secret(
    field: &str,
    inline: Option<&str>,
    env_name: Option<&str>,
) -> Result<Option<String>, ConfigError> {
    if let Some(value) = inline.filter(|v| !v.is_empty()) {
        return Ok(Some(value.to_string()));
    }
    match env_name {
        Some(name) => match std::env::var(name) {
            Ok(value) if !value.is_empty() => Ok(Some(value)),
            _ => Err(ConfigError::MissingEnv(format!("{} (for {})", name, field))),
        },
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file() {
        let err = load_config::<GatewayConfig>(Path::new("/nonexistent/otpgate.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = GatewayConfig::default();
        config.bind_address = "127.0.0.1:5055".to_string();
        save_config(&path, &config).unwrap();

        let loaded: GatewayConfig = load_config(&path).unwrap();
        assert_eq!(loaded.bind_address, "127.0.0.1:5055");
        assert_eq!(loaded.login.otp_timeout, config.login.otp_timeout);
    }

    #[test]
    fn test_resolve_secret_prefers_inline() {
        let value = resolve_secret("api_key", Some("inline"), Some("OTPGATE_TEST_UNSET_VAR")).unwrap();
        assert_eq!(value.as_deref(), Some("inline"));
    }

    #[test]
    fn test_resolve_secret_missing_env() {
        let err = resolve_secret("api_key", None, Some("OTPGATE_TEST_SURELY_UNSET_1234")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv(_)));
    }

    #[test]
    fn test_resolve_secret_absent() {
        assert_eq!(resolve_secret("token", None, None).unwrap(), None);
    }
}
