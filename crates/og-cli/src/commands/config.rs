//! Config command implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::output::{format_accounts, print_error, print_info, print_success, print_warning};
use og_core::config::{self, AccountConfig, GatewayConfig};

/// Path given on the command line, or the default location
pub fn resolve_config_path(config_path: Option<&PathBuf>) -> PathBuf {
    config_path
        .cloned()
        .unwrap_or_else(config::default_config_path)
}

/// Print the raw configuration file
pub fn config_show(config_path: Option<&PathBuf>) -> Result<()> {
    let path = resolve_config_path(config_path);

    if !path.exists() {
        print_warning(&format!("No configuration file found at {:?}", path));
        return Ok(());
    }

    print_info(&format!("Configuration file: {:?}", path));
    println!();

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    println!("{}", content);

    Ok(())
}

/// Write a starter configuration with one placeholder account
pub fn config_init(config_path: Option<&PathBuf>, force: bool) -> Result<()> {
    let path = resolve_config_path(config_path);

    if path.exists() && !force {
        print_error(&format!("Config file already exists: {:?}", path));
        print_info("Use --force to overwrite");
        return Ok(());
    }

    config::save_config(&path, &starter_config())
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    print_success(&format!("Created configuration file: {:?}", path));
    print_info("Edit the [[accounts]] entry, then run 'otpgate config check'");
    Ok(())
}

fn starter_config() -> GatewayConfig {
    let mut account = AccountConfig::new("primary", 0, "+10000000000");
    account.api_key_env = Some("OTPGATE_API_KEY".to_string());

    GatewayConfig {
        accounts: vec![account],
        ..GatewayConfig::default()
    }
}

/// Load and validate the daemon configuration, then list its accounts.
///
/// Secrets that cannot be resolved from the current environment are
/// reported as warnings only, since the daemon may run with a different one.
pub fn config_check(config_path: Option<&PathBuf>) -> Result<()> {
    let path = resolve_config_path(config_path);
    let config = match load_and_validate(&path) {
        Ok(c) => c,
        Err(e) => {
            print_error(&format!("{:#}", e));
            return Err(e);
        }
    };

    println!("{}", format_accounts(&config.accounts));

    for account in &config.accounts {
        if let Err(e) = account.api_key() {
            print_warning(&format!("Account '{}': {}", account.account_id, e));
        }
    }
    if let Err(e) = config.store.token() {
        print_warning(&format!("Store: {}", e));
    }

    print_success(&format!(
        "Configuration is valid ({} account(s))",
        config.accounts.len()
    ));
    Ok(())
}

fn load_and_validate(path: &Path) -> Result<GatewayConfig> {
    let config: GatewayConfig = config::load_config(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;
    Ok(config)
}
