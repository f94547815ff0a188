//! Wait command implementation
//!
//! Polls `/readiness` until the selected accounts are authorized. Fails as
//! soon as one of them is `failed`, mirroring the daemon's own
//! `wait_for`.

use std::time::Duration;

use anyhow::Result;
use tokio::time::Instant;

use og_core::api::ReadinessReport;
use og_core::types::AccountStatus;
use og_core::LoginPhase;

use crate::client::CallbackClient;
use crate::output::{format_readiness, print_error, print_info, print_success};

/// Result of waiting on account readiness
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Every selected account is authorized
    Ready,
    /// An account settled in `failed`
    Failed(AccountStatus),
    /// A selected account is not configured in the daemon
    Unknown(String),
}

/// Decide whether polling can stop
pub fn evaluate(report: &ReadinessReport, accounts: &[String]) -> Option<WaitOutcome> {
    let selected: Vec<&AccountStatus> = if accounts.is_empty() {
        report.accounts.iter().collect()
    } else {
        let mut selected = Vec::with_capacity(accounts.len());
        for id in accounts {
            match report.accounts.iter().find(|a| a.account_id.as_str() == id) {
                Some(status) => selected.push(status),
                None => return Some(WaitOutcome::Unknown(id.clone())),
            }
        }
        selected
    };

    if let Some(failed) = selected.iter().find(|a| a.phase == LoginPhase::Failed) {
        return Some(WaitOutcome::Failed((*failed).clone()));
    }
    if !selected.is_empty() && selected.iter().all(|a| a.is_authorized()) {
        return Some(WaitOutcome::Ready);
    }
    None
}

/// Block until the accounts are ready, one fails, or `timeout` passes
pub async fn wait_command(
    client: &CallbackClient,
    accounts: &[String],
    timeout: Duration,
    interval: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    let mut announced = false;

    loop {
        let report = match client.readiness().await {
            Ok(r) => r,
            Err(e) => {
                print_error(&format!("Failed to get readiness: {}", e));
                return Err(e.into());
            }
        };

        match evaluate(&report, accounts) {
            Some(WaitOutcome::Ready) => {
                print_success("All accounts authorized");
                return Ok(());
            }
            Some(WaitOutcome::Failed(status)) => {
                println!("{}", format_readiness(&report));
                let reason = status
                    .last_error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "unknown error".to_string());
                print_error(&format!(
                    "Account '{}' failed: {}",
                    status.account_id, reason
                ));
                anyhow::bail!("account {} failed", status.account_id);
            }
            Some(WaitOutcome::Unknown(id)) => {
                print_error(&format!("Unknown account: {}", id));
                anyhow::bail!("unknown account {}", id);
            }
            None => {}
        }

        if !announced {
            print_info("Waiting for accounts to authorize...");
            announced = true;
        }

        let now = Instant::now();
        if now >= deadline {
            println!("{}", format_readiness(&report));
            print_error(&format!(
                "Timed out after {}s waiting for readiness",
                timeout.as_secs()
            ));
            anyhow::bail!("timed out");
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}
