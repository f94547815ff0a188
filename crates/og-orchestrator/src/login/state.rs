//! Per-account login state

use og_core::time::current_time_millis;
use og_core::types::AccountStatus;
use og_core::{AccountId, LoginError, LoginPhase};

/// Whether the state machine permits `from -> to`
pub fn is_allowed(from: LoginPhase, to: LoginPhase) -> bool {
    use LoginPhase::*;

    match (from, to) {
        (Authorized | Failed, _) => false,
        (_, Failed) => true,
        (Idle, SessionRestoring | CodeRequesting) => true,
        (SessionRestoring, SessionValidating | CodeRequesting) => true,
        (SessionValidating, Authorized | CodeRequesting) => true,
        (CodeRequesting, AwaitingOtp) => true,
        (AwaitingOtp, SigningIn) => true,
        (SigningIn, Authorized | CodeRequesting) => true,
        _ => false,
    }
}

/// Transient login progress for one account.
///
/// Owned by the account's login task; everyone else sees [`AccountStatus`]
/// snapshots.
#[derive(Debug, Clone)]
pub struct AccountLoginState {
    account_id: AccountId,
    phase: LoginPhase,
    code_requested_at_ms: Option<u64>,
    code_attempts: u32,
    last_error: Option<LoginError>,
    /// Set between a code request and the consumption of its code
    code_outstanding: bool,
}

impl AccountLoginState {
    /// Fresh state in `Idle`
    pub fn new(account_id: AccountId) -> Self {
        Self {
            account_id,
            phase: LoginPhase::Idle,
            code_requested_at_ms: None,
            code_attempts: 0,
            last_error: None,
            code_outstanding: false,
        }
    }

    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    pub fn phase(&self) -> LoginPhase {
        self.phase
    }

    pub fn last_error(&self) -> Option<&LoginError> {
        self.last_error.as_ref()
    }

    pub fn code_attempts(&self) -> u32 {
        self.code_attempts
    }

    /// Move to `next`. Returns false (and stays put) for a forbidden transition.
    pub fn enter(&mut self, next: LoginPhase) -> bool {
        if !is_allowed(self.phase, next) {
            tracing::warn!(from = %self.phase, to = %next, "Ignoring invalid login transition");
            return false;
        }
        tracing::info!(from = %self.phase, to = %next, "Login phase changed");
        self.phase = next;
        true
    }

    /// Move to `Failed` with the given error
    pub fn fail(&mut self, error: LoginError) {
        tracing::warn!(phase = %self.phase, error = %error, "Login failed");
        self.last_error = Some(error);
        self.enter(LoginPhase::Failed);
    }

    /// Attach an error without changing phase
    pub fn record_error(&mut self, error: LoginError) {
        self.last_error = Some(error);
    }

    /// Forget the last error
    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Claim the right to send a code request.
    ///
    /// Returns false if a request is already outstanding for this attempt.
    pub fn begin_code_request(&mut self) -> bool {
        if self.code_outstanding {
            return false;
        }
        self.code_outstanding = true;
        true
    }

    /// Roll back a claim whose request failed
    pub fn abandon_code_request(&mut self) {
        self.code_outstanding = false;
    }

    /// Record a successful code request
    pub fn code_requested(&mut self) {
        self.code_requested_at_ms = Some(current_time_millis());
        self.code_attempts += 1;
    }

    /// The outstanding code has been taken from the inbox
    pub fn code_consumed(&mut self) {
        self.code_outstanding = false;
    }

    /// Snapshot for readiness
    pub fn status(&self) -> AccountStatus {
        AccountStatus {
            account_id: self.account_id.clone(),
            phase: self.phase,
            code_requested_at_ms: self.code_requested_at_ms,
            code_attempts: self.code_attempts,
            last_error: self.last_error.clone(),
        }
    }
}
