//! Readiness board
//!
//! Holds the latest [`AccountStatus`] published by every login task. Readers
//! (the callback server, dependent services) take snapshots or wait until a
//! set of accounts settles.

use std::collections::BTreeMap;

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::watch;

use og_core::types::AccountStatus;
use og_core::{AccountId, LoginPhase};

/// Why a set of accounts will not become usable
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadinessError {
    /// The account is not configured
    #[error("Unknown account: {0}")]
    UnknownAccount(AccountId),

    /// At least one account ended in `Failed`
    #[error("{} account(s) failed to log in", .0.len())]
    Failed(Vec<AccountStatus>),
}

/// Latest status per account plus a change signal
pub struct ReadinessBoard {
    /// Status indexed by account
    accounts: DashMap<AccountId, AccountStatus>,
    /// Bumped on every publish
    version: watch::Sender<u64>,
}

impl ReadinessBoard {
    /// Create an empty board
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            version: watch::channel(0).0,
        }
    }

    /// Add an account in `Idle`. Registering twice keeps the existing status.
    pub fn register(&self, account_id: AccountId) {
        self.accounts
            .entry(account_id.clone())
            .or_insert_with(|| AccountStatus::idle(account_id));
        self.version.send_modify(|v| *v += 1);
    }

    /// Replace an account's status
    pub fn publish(&self, status: AccountStatus) {
        self.accounts.insert(status.account_id.clone(), status);
        self.version.send_modify(|v| *v += 1);
    }

    /// Status of one account
    pub fn get(&self, account_id: &AccountId) -> Option<AccountStatus> {
        self.accounts.get(account_id).map(|r| r.value().clone())
    }

    /// Status of every account, ordered by id
    pub fn snapshot(&self) -> BTreeMap<AccountId, AccountStatus> {
        self.accounts
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }

    /// Phase of every account, ordered by id
    pub fn phases(&self) -> BTreeMap<AccountId, LoginPhase> {
        self.accounts
            .iter()
            .map(|r| (r.key().clone(), r.value().phase))
            .collect()
    }

    /// True when every registered account is authorized
    pub fn all_authorized(&self) -> bool {
        !self.accounts.is_empty() && self.accounts.iter().all(|r| r.value().is_authorized())
    }

    /// Number of registered accounts
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Check if no accounts are registered
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Receiver notified after every publish
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    /// Wait until every listed account is authorized.
    ///
    /// Fails as soon as any of them is `Failed`. Accounts whose task was
    /// cancelled before settling never resolve this; combine with a timeout
    /// or cancellation token.
    pub async fn wait_for(&self, account_ids: &[AccountId]) -> Result<(), ReadinessError> {
        let mut rx = self.subscribe();
        loop {
            rx.borrow_and_update();

            let mut failed = Vec::new();
            let mut pending = false;
            for id in account_ids {
                let status = self
                    .get(id)
                    .ok_or_else(|| ReadinessError::UnknownAccount(id.clone()))?;
                match status.phase {
                    LoginPhase::Authorized => {}
                    LoginPhase::Failed => failed.push(status),
                    _ => pending = true,
                }
            }

            if !failed.is_empty() {
                return Err(ReadinessError::Failed(failed));
            }
            if !pending {
                return Ok(());
            }

            if rx.changed().await.is_err() {
                // Sender is owned by self
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for ReadinessBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use og_core::LoginError;
    use std::sync::Arc;
    use std::time::Duration;

    fn status(id: &str, phase: LoginPhase) -> AccountStatus {
        AccountStatus {
            phase,
            ..AccountStatus::idle(AccountId::new(id))
        }
    }

    #[test]
    fn test_register_starts_idle() {
        let board = ReadinessBoard::new();
        board.register(AccountId::new("source"));
        assert_eq!(
            board.get(&AccountId::new("source")).unwrap().phase,
            LoginPhase::Idle
        );
        assert!(!board.all_authorized());
    }

    #[test]
    fn test_snapshot_is_ordered() {
        let board = ReadinessBoard::new();
        board.register(AccountId::new("b"));
        board.register(AccountId::new("a"));
        let ids: Vec<_> = board.phases().into_keys().collect();
        assert_eq!(ids, vec![AccountId::new("a"), AccountId::new("b")]);
    }

    #[test]
    fn test_register_does_not_reset_progress() {
        let board = ReadinessBoard::new();
        board.publish(status("source", LoginPhase::Authorized));
        board.register(AccountId::new("source"));
        assert!(board.all_authorized());
    }

    #[tokio::test]
    async fn test_wait_for_unknown_account() {
        let board = ReadinessBoard::new();
        let err = board.wait_for(&[AccountId::new("ghost")]).await.unwrap_err();
        assert_eq!(err, ReadinessError::UnknownAccount(AccountId::new("ghost")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_resolves_when_authorized() {
        let board = Arc::new(ReadinessBoard::new());
        board.register(AccountId::new("source"));

        let writer = Arc::clone(&board);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            writer.publish(status("source", LoginPhase::AwaitingOtp));
            tokio::time::sleep(Duration::from_secs(1)).await;
            writer.publish(status("source", LoginPhase::Authorized));
        });

        board.wait_for(&[AccountId::new("source")]).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_fails_fast() {
        let board = ReadinessBoard::new();
        board.register(AccountId::new("a"));
        let mut failed = status("b", LoginPhase::Failed);
        failed.last_error = Some(LoginError::OtpTimeout);
        board.publish(failed.clone());

        let err = board
            .wait_for(&[AccountId::new("a"), AccountId::new("b")])
            .await
            .unwrap_err();
        assert_eq!(err, ReadinessError::Failed(vec![failed]));
    }
}
