//! Login task driver
//!
//! One task per account. It restores a cached session if it can, otherwise
//! requests a code, waits for it in the inbox and signs in. Every phase change
//! is published to the readiness board.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use og_core::config::{AccountConfig, LoginConfig, MAX_CODE_ATTEMPTS_CAP};
use og_core::traits::{SessionClient, SessionStore};
use og_core::types::AccountStatus;
use og_core::{AccountId, LoginError, LoginPhase};

use super::state::AccountLoginState;
use crate::cache::LocalSessionCache;
use crate::inbox::OtpInbox;
use crate::readiness::ReadinessBoard;

/// Marker for a wait aborted by the cancellation token
struct Cancelled;

/// Run `fut` unless `cancel` fires first
async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, Cancelled> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Cancelled),
        out = fut => Ok(out),
    }
}

/// Where a restored session came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Restored {
    Local,
    Remote,
}

/// Drives one account from `Idle` to `Authorized` or `Failed`
pub struct LoginTask {
    phone: String,
    session_key: String,
    cache: LocalSessionCache,
    client: Box<dyn SessionClient>,
    store: Arc<dyn SessionStore>,
    inbox: Arc<OtpInbox>,
    board: Arc<ReadinessBoard>,
    config: LoginConfig,
    state: AccountLoginState,
    last_code_request: Option<Instant>,
}

impl LoginTask {
    pub fn new(
        account: &AccountConfig,
        session_dir: &Path,
        client: Box<dyn SessionClient>,
        store: Arc<dyn SessionStore>,
        inbox: Arc<OtpInbox>,
        board: Arc<ReadinessBoard>,
        mut config: LoginConfig,
    ) -> Self {
        config.max_code_attempts = config.max_code_attempts.clamp(1, MAX_CODE_ATTEMPTS_CAP);
        Self {
            phone: account.phone_number.clone(),
            session_key: account.session_key(),
            cache: LocalSessionCache::new(account.local_session_path(session_dir)),
            client,
            store,
            inbox,
            board,
            config,
            state: AccountLoginState::new(account.id()),
            last_code_request: None,
        }
    }

    /// Account this task logs in
    pub fn account_id(&self) -> &AccountId {
        self.state.account_id()
    }

    /// Run to a terminal phase, or until `cancel` fires.
    ///
    /// A cancelled task keeps its last stable phase and reports
    /// [`LoginError::Cancelled`]. Returns the final status.
    pub async fn run(mut self, cancel: CancellationToken) -> AccountStatus {
        let span = tracing::info_span!("login", account = %self.state.account_id());

        async move {
            self.publish();
            if self.drive(&cancel).await.is_err() {
                tracing::info!(phase = %self.state.phase(), "Login cancelled");
                self.state.record_error(LoginError::Cancelled);
                self.publish();
            }
            self.state.status()
        }
        .instrument(span)
        .await
    }

    async fn drive(&mut self, cancel: &CancellationToken) -> Result<(), Cancelled> {
        self.transition(LoginPhase::SessionRestoring);
        let restored = until_cancelled(cancel, self.restore_session()).await?;

        if let Err(e) = until_cancelled(cancel, self.client.connect()).await? {
            self.fail(e.into());
            return Ok(());
        }

        if let Some(source) = restored {
            self.transition(LoginPhase::SessionValidating);
            match until_cancelled(cancel, self.client.is_authorized()).await? {
                Ok(true) => {
                    tracing::info!("Restored session is authorized");
                    if source == Restored::Local {
                        until_cancelled(cancel, self.sync_local_session()).await?;
                    }
                    self.transition(LoginPhase::Authorized);
                    return Ok(());
                }
                Ok(false) => {
                    tracing::warn!("Restored session was rejected, discarding it");
                    until_cancelled(cancel, self.discard_session()).await?;
                }
                Err(e) => {
                    self.fail(e.into());
                    return Ok(());
                }
            }
        }

        self.transition(LoginPhase::CodeRequesting);
        self.login_with_code(cancel).await
    }

    /// Request a code, wait for it and sign in; repeats on an invalid code
    /// until the attempt budget is spent
    async fn login_with_code(&mut self, cancel: &CancellationToken) -> Result<(), Cancelled> {
        let account_id = self.state.account_id().clone();

        loop {
            if let Some(ready_at) = self.next_request_at() {
                tracing::debug!(
                    wait = ?ready_at.saturating_duration_since(Instant::now()),
                    "Waiting before requesting another code"
                );
                until_cancelled(cancel, tokio::time::sleep_until(ready_at)).await?;
            }

            if self.inbox.discard(&account_id) {
                tracing::debug!("Dropped a code delivered before the request");
            }

            if self.state.begin_code_request() {
                match until_cancelled(cancel, self.client.request_code(&self.phone)).await? {
                    Ok(()) => {
                        self.last_code_request = Some(Instant::now());
                        self.state.code_requested();
                        tracing::info!(
                            attempt = self.state.code_attempts(),
                            max_attempts = self.config.max_code_attempts,
                            "Login code requested"
                        );
                    }
                    Err(e) => {
                        self.state.abandon_code_request();
                        self.fail(e.into());
                        return Ok(());
                    }
                }
            } else {
                tracing::warn!("Code request already outstanding, not sending another");
            }

            self.transition(LoginPhase::AwaitingOtp);
            let waited = until_cancelled(
                cancel,
                self.inbox.await_value(&account_id, self.config.otp_timeout),
            )
            .await?;
            self.state.code_consumed();

            let entry = match waited {
                Ok(entry) => entry,
                Err(e) => {
                    self.fail(e.into());
                    return Ok(());
                }
            };

            // Signing in is never interrupted half way
            self.transition(LoginPhase::SigningIn);
            match self.client.sign_in(&self.phone, &entry.code).await {
                Ok(()) => {
                    tracing::info!("Signed in");
                    self.persist_session().await;
                    self.transition(LoginPhase::Authorized);
                    return Ok(());
                }
                Err(e) => {
                    let error = LoginError::from(e);
                    if !error.is_retryable()
                        || self.state.code_attempts() >= self.config.max_code_attempts
                    {
                        self.fail(error);
                        return Ok(());
                    }
                    tracing::warn!(
                        attempt = self.state.code_attempts(),
                        error = %error,
                        "Login code rejected, requesting a new one"
                    );
                    self.state.record_error(error);
                    self.transition(LoginPhase::CodeRequesting);
                }
            }
        }
    }

    /// Earliest instant the next code request may be sent
    fn next_request_at(&self) -> Option<Instant> {
        self.last_code_request
            .map(|last| last + self.config.code_request_interval)
            .filter(|at| *at > Instant::now())
    }

    /// Make a session available in the local cache.
    ///
    /// The local copy wins; otherwise the remote store is consulted. A store
    /// error counts as "no session" but is recorded on the account.
    async fn restore_session(&mut self) -> Option<Restored> {
        match self.cache.load().await {
            Ok(Some(blob)) => {
                tracing::info!(
                    bytes = blob.len(),
                    fingerprint = %blob.fingerprint(),
                    "Found local session"
                );
                return Some(Restored::Local);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(path = %self.cache.path().display(), error = %e, "Failed to read local session");
            }
        }

        match self.store.fetch(&self.session_key).await {
            Ok(Some(blob)) => {
                if let Err(e) = self.cache.save(&blob).await {
                    tracing::warn!(path = %self.cache.path().display(), error = %e, "Failed to cache restored session");
                    self.state.record_error(LoginError::StoreUnavailable {
                        message: format!("failed to cache restored session: {}", e),
                    });
                    self.publish();
                    return None;
                }
                tracing::info!(
                    store = self.store.name(),
                    bytes = blob.len(),
                    fingerprint = %blob.fingerprint(),
                    "Restored session from store"
                );
                Some(Restored::Remote)
            }
            Ok(None) => {
                tracing::info!(store = self.store.name(), "No stored session");
                None
            }
            Err(e) => {
                tracing::warn!(store = self.store.name(), error = %e, "Session store fetch failed, continuing without a session");
                self.state.record_error(LoginError::from(&e));
                self.publish();
                None
            }
        }
    }

    /// Drop a session the service no longer accepts, locally and remotely
    async fn discard_session(&mut self) {
        if let Err(e) = self.cache.remove().await {
            tracing::warn!(path = %self.cache.path().display(), error = %e, "Failed to remove local session");
        }
        if let Err(e) = self.store.delete(&self.session_key).await {
            tracing::warn!(store = self.store.name(), error = %e, "Failed to delete stored session");
        }
    }

    /// Upload a locally cached session the store does not have yet
    async fn sync_local_session(&mut self) {
        match self.store.exists(&self.session_key).await {
            Ok(true) => {}
            Ok(false) => self.persist_session().await,
            Err(e) => {
                tracing::warn!(store = self.store.name(), error = %e, "Could not check stored session");
            }
        }
    }

    /// Copy the local session to the store.
    ///
    /// Failure never demotes the login; it is logged and kept as the
    /// account's last error.
    async fn persist_session(&mut self) {
        let blob = match self.cache.load().await {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                tracing::warn!(path = %self.cache.path().display(), "No local session to persist");
                self.state.record_error(LoginError::StoreUnavailable {
                    message: "no local session to persist".to_string(),
                });
                return;
            }
            Err(e) => {
                tracing::error!(path = %self.cache.path().display(), error = %e, "Failed to read local session for persisting");
                self.state.record_error(LoginError::StoreUnavailable {
                    message: e.to_string(),
                });
                return;
            }
        };

        match self.store.put(&self.session_key, &blob).await {
            Ok(()) => {
                self.state.clear_error();
                tracing::info!(
                    store = self.store.name(),
                    bytes = blob.len(),
                    fingerprint = %blob.fingerprint(),
                    "Session persisted"
                );
            }
            Err(e) => {
                tracing::error!(
                    store = self.store.name(),
                    error = %e,
                    "Failed to persist session; the next start will need a new code"
                );
                self.state.record_error(LoginError::from(&e));
            }
        }
    }

    fn transition(&mut self, next: LoginPhase) {
        if self.state.enter(next) {
            self.publish();
        }
    }

    fn fail(&mut self, error: LoginError) {
        self.state.fail(error);
        self.publish();
    }

    fn publish(&self) {
        self.board.publish(self.state.status());
    }
}
