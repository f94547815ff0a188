//! Auth orchestrator
//!
//! Owns the OTP inbox and readiness board, starts one login task per
//! configured account and aggregates their outcomes. It never retries on a
//! task's behalf.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use og_core::config::{AccountConfig, LoginConfig};
use og_core::error::ConfigError;
use og_core::traits::{SessionClient, SessionStore};
use og_core::types::AccountStatus;
use og_core::{AccountId, LoginError, LoginPhase};

use crate::inbox::OtpInbox;
use crate::login::LoginTask;
use crate::readiness::{ReadinessBoard, ReadinessError};

/// Builder-side orchestrator: accounts are added, then [`spawn`](Self::spawn)ed
pub struct AuthOrchestrator {
    store: Arc<dyn SessionStore>,
    config: LoginConfig,
    session_dir: PathBuf,
    inbox: Arc<OtpInbox>,
    board: Arc<ReadinessBoard>,
    tasks: Vec<LoginTask>,
}

impl AuthOrchestrator {
    /// Create an orchestrator sharing one store and login policy
    pub fn new(
        store: Arc<dyn SessionStore>,
        config: LoginConfig,
        session_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            config,
            session_dir: session_dir.into(),
            inbox: Arc::new(OtpInbox::new()),
            board: Arc::new(ReadinessBoard::new()),
            tasks: Vec::new(),
        }
    }

    /// Register an account and the client that will log it in
    pub fn add_account(
        &mut self,
        account: &AccountConfig,
        client: Box<dyn SessionClient>,
    ) -> Result<(), ConfigError> {
        self.config.validate()?;
        account.validate()?;
        let account_id = account.id();
        if self.inbox.is_known(&account_id) {
            return Err(ConfigError::DuplicateAccount(account_id.to_string()));
        }

        self.inbox.register(account_id.clone());
        self.board.register(account_id);
        self.tasks.push(LoginTask::new(
            account,
            &self.session_dir,
            client,
            Arc::clone(&self.store),
            Arc::clone(&self.inbox),
            Arc::clone(&self.board),
            self.config.clone(),
        ));
        Ok(())
    }

    /// Inbox the callback server submits into
    pub fn inbox(&self) -> Arc<OtpInbox> {
        Arc::clone(&self.inbox)
    }

    /// Board the login tasks publish to
    pub fn board(&self) -> Arc<ReadinessBoard> {
        Arc::clone(&self.board)
    }

    /// Phase per account
    pub fn readiness(&self) -> BTreeMap<AccountId, LoginPhase> {
        self.board.phases()
    }

    /// Start every login task.
    ///
    /// Tasks stop early when `cancel` (or [`RunningOrchestrator::shutdown`])
    /// fires.
    pub fn spawn(self, cancel: CancellationToken) -> RunningOrchestrator {
        let cancel = cancel.child_token();
        let handles: Vec<_> = self
            .tasks
            .into_iter()
            .map(|task| {
                let account_id = task.account_id().clone();
                let handle = tokio::spawn(task.run(cancel.clone()));
                (account_id, handle)
            })
            .collect();

        tracing::info!(
            accounts = handles.len(),
            store = self.store.name(),
            "Started login tasks"
        );

        RunningOrchestrator {
            inbox: self.inbox,
            board: self.board,
            cancel,
            handles,
        }
    }
}

/// Outcome of every login task after [`RunningOrchestrator::join`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginSummary {
    /// Accounts that reached `Authorized`
    pub authorized: Vec<AccountId>,
    /// Accounts that ended `Failed`, with their last error
    pub failed: Vec<AccountStatus>,
    /// Accounts whose task was cancelled before settling
    pub interrupted: Vec<AccountStatus>,
}

impl LoginSummary {
    /// True when every account is authorized
    pub fn all_authorized(&self) -> bool {
        self.failed.is_empty() && self.interrupted.is_empty()
    }

    fn record(&mut self, status: AccountStatus) {
        match status.phase {
            LoginPhase::Authorized => self.authorized.push(status.account_id),
            LoginPhase::Failed => self.failed.push(status),
            _ => self.interrupted.push(status),
        }
    }
}

/// Handle to running login tasks
pub struct RunningOrchestrator {
    inbox: Arc<OtpInbox>,
    board: Arc<ReadinessBoard>,
    cancel: CancellationToken,
    handles: Vec<(AccountId, JoinHandle<AccountStatus>)>,
}

impl RunningOrchestrator {
    pub fn inbox(&self) -> Arc<OtpInbox> {
        Arc::clone(&self.inbox)
    }

    pub fn board(&self) -> Arc<ReadinessBoard> {
        Arc::clone(&self.board)
    }

    /// Phase per account
    pub fn readiness(&self) -> BTreeMap<AccountId, LoginPhase> {
        self.board.phases()
    }

    /// Wait until the listed accounts are authorized, failing fast
    pub async fn wait_for(&self, account_ids: &[AccountId]) -> Result<(), ReadinessError> {
        self.board.wait_for(account_ids).await
    }

    /// Cancel every task that has not settled yet
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Wait for every task and summarise the outcome.
    ///
    /// A task that panicked is reported as failed with a client error.
    pub async fn join(self) -> LoginSummary {
        let mut summary = LoginSummary::default();
        let (account_ids, handles): (Vec<_>, Vec<_>) = self.handles.into_iter().unzip();
        let results = join_all(handles).await;

        for (account_id, result) in account_ids.into_iter().zip(results) {
            let status = match result {
                Ok(status) => status,
                Err(e) => {
                    tracing::error!(account = %account_id, error = %e, "Login task aborted");
                    let mut status = self
                        .board
                        .get(&account_id)
                        .unwrap_or_else(|| AccountStatus::idle(account_id.clone()));
                    status.phase = LoginPhase::Failed;
                    status.last_error = Some(LoginError::Client {
                        message: format!("login task aborted: {}", e),
                    });
                    self.board.publish(status.clone());
                    status
                }
            };
            summary.record(status);
        }

        tracing::info!(
            authorized = summary.authorized.len(),
            failed = summary.failed.len(),
            interrupted = summary.interrupted.len(),
            "Login tasks finished"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(id: &str, phase: LoginPhase) -> AccountStatus {
        AccountStatus {
            phase,
            ..AccountStatus::idle(AccountId::new(id))
        }
    }

    #[test]
    fn test_summary_buckets() {
        let mut summary = LoginSummary::default();
        summary.record(status("a", LoginPhase::Authorized));
        assert!(summary.all_authorized());

        summary.record(status("b", LoginPhase::Failed));
        summary.record(status("c", LoginPhase::AwaitingOtp));
        assert_eq!(summary.authorized, vec![AccountId::new("a")]);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.interrupted[0].account_id, AccountId::new("c"));
        assert!(!summary.all_authorized());
    }
}
