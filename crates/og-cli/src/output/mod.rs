//! Output formatting utilities for the CLI
//!
//! Tables for account readiness and configured accounts, plus colored
//! status messages.

use tabled::{
    settings::{Style, Width},
    Table, Tabled,
};

use og_core::api::ReadinessReport;
use og_core::config::AccountConfig;
use og_core::time::elapsed_millis;
use og_core::types::AccountStatus;

/// Format a readiness report as a table of accounts
///
/// Returns "No accounts configured" when the report is empty.
pub fn format_readiness(report: &ReadinessReport) -> String {
    if report.accounts.is_empty() {
        return "No accounts configured".to_string();
    }

    let rows: Vec<AccountRow> = report.accounts.iter().map(account_row).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded()).with(Width::wrap(120));

    let summary = if report.ready {
        "All accounts authorized".to_string()
    } else {
        let authorized = report.accounts.iter().filter(|a| a.is_authorized()).count();
        format!("{}/{} accounts authorized", authorized, report.accounts.len())
    };

    format!("{}\n{}", table, summary)
}

#[derive(Tabled)]
struct AccountRow {
    #[tabled(rename = "ACCOUNT")]
    account: String,
    #[tabled(rename = "PHASE")]
    phase: String,
    #[tabled(rename = "CODES")]
    attempts: u32,
    #[tabled(rename = "LAST CODE")]
    last_code: String,
    #[tabled(rename = "LAST ERROR")]
    last_error: String,
}

fn account_row(status: &AccountStatus) -> AccountRow {
    AccountRow {
        account: status.account_id.to_string(),
        phase: status.phase.to_string(),
        attempts: status.code_attempts,
        last_code: status
            .code_requested_at_ms
            .map(|ms| format!("{} ago", format_duration(elapsed_millis(ms) / 1000)))
            .unwrap_or_else(|| "-".to_string()),
        last_error: status
            .last_error
            .as_ref()
            .map(|e| truncate(&e.to_string(), 48))
            .unwrap_or_else(|| "-".to_string()),
    }
}

/// Format configured accounts as a table
pub fn format_accounts(accounts: &[AccountConfig]) -> String {
    if accounts.is_empty() {
        return "No accounts configured".to_string();
    }

    #[derive(Tabled)]
    struct ConfigRow {
        #[tabled(rename = "ACCOUNT")]
        account: String,
        #[tabled(rename = "PHONE")]
        phone: String,
        #[tabled(rename = "API ID")]
        api_id: i64,
        #[tabled(rename = "SESSION KEY")]
        session_key: String,
    }

    let rows: Vec<ConfigRow> = accounts
        .iter()
        .map(|a| ConfigRow {
            account: a.account_id.clone(),
            phone: mask_phone(&a.phone_number),
            api_id: a.api_id,
            session_key: a.session_key(),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Format duration in human-readable form
pub fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}

/// Keep the last four digits of a phone number
fn mask_phone(phone: &str) -> String {
    let digits = phone.chars().count();
    if digits <= 4 {
        return phone.to_string();
    }
    let tail: String = phone.chars().skip(digits - 4).collect();
    format!("{}{}", "*".repeat(digits - 4), tail)
}

/// Truncate a string with ellipsis if too long
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

/// Print a success message in green with a checkmark prefix
pub fn print_success(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Green),
        Print("✓ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an error message in red with an X prefix, to stderr
pub fn print_error(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a warning message in yellow, to stderr
pub fn print_warning(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Yellow),
        Print("⚠ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an informational message in cyan
pub fn print_info(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Cyan),
        Print("ℹ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use og_core::types::LoginPhase;
    use og_core::{AccountId, LoginError};

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(125), "2m 5s");
        assert_eq!(format_duration(7260), "2h 1m");
        assert_eq!(format_duration(90000), "1d 1h");
    }

    #[test]
    fn test_mask_phone() {
        assert_eq!(mask_phone("+15551234567"), "********4567");
        assert_eq!(mask_phone("123"), "123");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a long error message", 10), "a long ...");
    }

    #[test]
    fn test_format_readiness() {
        let mut source = AccountStatus::idle(AccountId::new("source"));
        source.phase = LoginPhase::Authorized;
        let mut dest = AccountStatus::idle(AccountId::new("dest"));
        dest.phase = LoginPhase::Failed;
        dest.last_error = Some(LoginError::OtpTimeout);

        let out = format_readiness(&ReadinessReport::from_accounts(vec![source, dest]));
        assert!(out.contains("source"));
        assert!(out.contains("authorized"));
        assert!(out.contains("No OTP arrived"));
        assert!(out.contains("1/2 accounts authorized"));
    }

    #[test]
    fn test_format_empty() {
        assert_eq!(
            format_readiness(&ReadinessReport::from_accounts(vec![])),
            "No accounts configured"
        );
        assert_eq!(format_accounts(&[]), "No accounts configured");
    }

    #[test]
    fn test_format_accounts_masks_phone() {
        let out = format_accounts(&[AccountConfig::new("source", 12345, "+15551234567")]);
        assert!(out.contains("source.session"));
        assert!(out.contains("4567"));
        assert!(!out.contains("+1555"));
    }
}
