//! CLI integration tests
//!
//! Tests the otpgate CLI using assert_cmd, against an in-process callback
//! server where a daemon is needed.

use std::net::SocketAddr;
use std::sync::Arc;

use assert_cmd::Command;
use predicates::prelude::*;
use tokio_util::sync::CancellationToken;

use og_core::types::AccountStatus;
use og_core::{AccountId, LoginError, LoginPhase};
use og_orchestrator::server::{CallbackServer, CallbackState};
use og_orchestrator::{OtpInbox, ReadinessBoard};

const VALID_CONFIG: &str = r#"
bind_address = "127.0.0.1:5000"

[store]
kind = "memory"

[[accounts]]
account_id = "source"
api_id = 12345
api_key = "abc"
phone_number = "+15550000001"

[[accounts]]
account_id = "dest"
api_id = 12345
api_key_env = "OTPGATE_TEST_UNSET_KEY"
phone_number = "+15550000002"
"#;

fn otpgate() -> Command {
    let mut cmd = Command::cargo_bin("otpgate")
        .expect("Failed to locate otpgate binary - ensure it's built before running tests");
    cmd.env_remove("OTPGATE_URL").env_remove("OTPGATE_CONFIG");
    cmd
}

/// Callback server on an ephemeral port, running on its own runtime thread
fn spawn_daemon(accounts: &[&str]) -> (SocketAddr, Arc<OtpInbox>, Arc<ReadinessBoard>) {
    let inbox = Arc::new(OtpInbox::with_accounts(
        accounts.iter().map(|a| AccountId::new(*a)),
    ));
    let board = Arc::new(ReadinessBoard::new());
    for account in accounts {
        board.register(AccountId::new(*account));
    }

    let state = CallbackState {
        inbox: Arc::clone(&inbox),
        board: Arc::clone(&board),
    };
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let server = CallbackServer::bind("127.0.0.1:0", state).await.unwrap();
            tx.send(server.local_addr().unwrap()).unwrap();
            server.serve(CancellationToken::new()).await.unwrap();
        });
    });

    (rx.recv().unwrap(), inbox, board)
}

fn url(addr: SocketAddr) -> String {
    format!("http://{}", addr)
}

#[test]
fn test_cli_help() {
    otpgate()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("otpgate"))
        .stdout(predicate::str::contains("login codes"));
}

#[test]
fn test_cli_version() {
    otpgate()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("otpgate"));
}

#[test]
fn test_cli_submit_help() {
    otpgate()
        .args(["submit", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--account"));
}

#[test]
fn test_cli_config_path_uses_argument() {
    otpgate()
        .args(["--config", "/etc/otpgate/custom.toml", "config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/etc/otpgate/custom.toml"));
}

#[test]
fn test_cli_config_check_valid() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, VALID_CONFIG).unwrap();

    otpgate()
        .env_remove("OTPGATE_TEST_UNSET_KEY")
        .arg("--config")
        .arg(&path)
        .args(["config", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("source"))
        .stdout(predicate::str::contains("dest.session"))
        .stdout(predicate::str::contains("Configuration is valid"))
        .stderr(predicate::str::contains("OTPGATE_TEST_UNSET_KEY"));
}

#[test]
fn test_cli_config_init_then_check() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    otpgate()
        .arg("--config")
        .arg(&path)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created configuration file"));

    otpgate()
        .arg("--config")
        .arg(&path)
        .args(["config", "init"])
        .assert()
        .success()
        .stderr(predicate::str::contains("already exists"));

    otpgate()
        .arg("--config")
        .arg(&path)
        .args(["config", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("primary"));
}

#[test]
fn test_cli_config_check_duplicate_account() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let duplicated = VALID_CONFIG.replace("account_id = \"dest\"", "account_id = \"source\"");
    std::fs::write(&path, duplicated).unwrap();

    otpgate()
        .arg("--config")
        .arg(&path)
        .args(["config", "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("source"));
}

#[test]
fn test_cli_config_check_missing_file() {
    otpgate()
        .args(["--config", "/nonexistent/otpgate.toml", "config", "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_cli_status_unreachable() {
    otpgate()
        .args(["--url", "http://127.0.0.1:9", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Is the orchestrator running?"));
}

#[test]
fn test_cli_submit_delivers_code() {
    let (addr, inbox, _board) = spawn_daemon(&["source", "dest"]);

    otpgate()
        .args(["--url", &url(addr), "submit", "123456", "--account", "dest"])
        .assert()
        .success()
        .stdout(predicate::str::contains("OTP received"))
        .stdout(predicate::str::contains("dest"));

    let entry = inbox.take(&AccountId::new("dest")).unwrap().unwrap();
    assert_eq!(entry.code, "123456");
    assert!(!inbox.has_pending(&AccountId::new("source")));
}

#[test]
fn test_cli_submit_unknown_account() {
    let (addr, _inbox, _board) = spawn_daemon(&["source"]);

    otpgate()
        .args(["--url", &url(addr), "submit", "123456", "--account", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("404"));
}

#[test]
fn test_cli_submit_single_account_without_id() {
    let (addr, inbox, _board) = spawn_daemon(&["source"]);

    otpgate()
        .args(["--url", &url(addr), "submit", "654321"])
        .assert()
        .success();

    assert!(inbox.has_pending(&AccountId::new("source")));
}

#[test]
fn test_cli_status_and_wait() {
    let (addr, _inbox, board) = spawn_daemon(&["source", "dest"]);

    let mut source = AccountStatus::idle(AccountId::new("source"));
    source.phase = LoginPhase::Authorized;
    board.publish(source);

    otpgate()
        .args(["--url", &url(addr), "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("authorized"))
        .stdout(predicate::str::contains("1/2 accounts authorized"));

    otpgate()
        .args(["--url", &url(addr), "wait", "source", "--timeout", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("All accounts authorized"));

    let mut dest = AccountStatus::idle(AccountId::new("dest"));
    dest.phase = LoginPhase::Failed;
    dest.last_error = Some(LoginError::OtpTimeout);
    board.publish(dest);

    otpgate()
        .args(["--url", &url(addr), "wait", "--timeout", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Account 'dest' failed"));
}

#[test]
fn test_cli_wait_times_out() {
    let (addr, _inbox, _board) = spawn_daemon(&["source"]);

    otpgate()
        .args(["--url", &url(addr), "wait", "--timeout", "1", "--interval", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Timed out"));
}
