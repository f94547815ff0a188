//! OTP inbox
//!
//! Process-wide mailbox keyed by account. The callback server writes codes in
//! with [`OtpInbox::submit`]; each account's login task reads them with
//! [`OtpInbox::await_value`].
//!
//! # Slot model
//!
//! Every registered account owns one `watch` slot holding `Option<OtpEntry>`.
//! A submit replaces the slot content (last write wins, never a queue). A
//! waiter takes the value out of the slot in the same step that observes it,
//! so a code is handed out at most once even if the waiter then times out or
//! the sign-in is retried.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::watch;

use og_core::error::InboxError;
use og_core::time::current_time_millis;
use og_core::{AccountId, OtpEntry};

type Slot = Arc<watch::Sender<Option<OtpEntry>>>;

/// Keyed OTP mailbox with at most one pending value per account
#[derive(Default)]
pub struct OtpInbox {
    /// One slot per configured account
    slots: DashMap<AccountId, Slot>,
}

impl OtpInbox {
    /// Create an inbox with no accounts
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an inbox accepting codes for the given accounts
    pub fn with_accounts(accounts: impl IntoIterator<Item = AccountId>) -> Self {
        let inbox = Self::new();
        for account in accounts {
            inbox.register(account);
        }
        inbox
    }

    /// Accept codes for an account. Registering twice keeps the existing slot.
    pub fn register(&self, account_id: AccountId) {
        self.slots
            .entry(account_id)
            .or_insert_with(|| Arc::new(watch::channel(None).0));
    }

    /// Whether the account is registered
    pub fn is_known(&self, account_id: &AccountId) -> bool {
        self.slots.contains_key(account_id)
    }

    /// Registered accounts, sorted
    pub fn accounts(&self) -> Vec<AccountId> {
        let mut ids: Vec<_> = self.slots.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Number of registered accounts
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if no accounts are registered
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot(&self, account_id: &AccountId) -> Result<Slot, InboxError> {
        self.slots
            .get(account_id)
            .map(|r| Arc::clone(&r))
            .ok_or_else(|| InboxError::UnknownAccount(account_id.clone()))
    }

    /// Deliver a code for an account.
    ///
    /// Unknown accounts and empty codes are rejected without touching any
    /// slot. A pending, unconsumed code is replaced.
    pub fn submit(&self, account_id: &AccountId, code: &str) -> Result<(), InboxError> {
        let slot = self.slot(account_id)?;

        let code = code.trim();
        if code.is_empty() {
            return Err(InboxError::EmptyCode);
        }

        let entry = OtpEntry {
            account_id: account_id.clone(),
            code: code.to_string(),
            received_at_ms: current_time_millis(),
        };

        if slot.send_replace(Some(entry)).is_some() {
            tracing::warn!(account = %account_id, "Replaced an unconsumed OTP");
        } else {
            tracing::info!(account = %account_id, "OTP received");
        }
        Ok(())
    }

    /// Wait for a code, consuming it.
    ///
    /// Resolves as soon as a value is present (including one submitted before
    /// the call). On timeout the slot is cleared so no stale code survives the
    /// attempt. Dropping the returned future cancels the wait.
    pub async fn await_value(
        &self,
        account_id: &AccountId,
        timeout: Duration,
    ) -> Result<OtpEntry, InboxError> {
        let slot = self.slot(account_id)?;
        let mut rx = slot.subscribe();

        let taker = Arc::clone(&slot);
        let wait = async move {
            loop {
                let pending = rx.borrow_and_update().is_some();
                if pending {
                    if let Some(entry) = taker.send_replace(None) {
                        return entry;
                    }
                }
                if rx.changed().await.is_err() {
                    // The sender lives in `taker`, so this cannot happen
                    std::future::pending::<()>().await;
                }
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(entry) => Ok(entry),
            Err(_) => {
                slot.send_replace(None);
                Err(InboxError::TimedOut)
            }
        }
    }

    /// Take a pending code without waiting
    pub fn take(&self, account_id: &AccountId) -> Result<Option<OtpEntry>, InboxError> {
        Ok(self.slot(account_id)?.send_replace(None))
    }

    /// Drop any pending code. Returns whether one was pending.
    pub fn discard(&self, account_id: &AccountId) -> bool {
        match self.slot(account_id) {
            Ok(slot) => slot.send_replace(None).is_some(),
            Err(_) => false,
        }
    }

    /// Whether a code is waiting to be consumed
    pub fn has_pending(&self, account_id: &AccountId) -> bool {
        self.slot(account_id)
            .map(|slot| slot.borrow().is_some())
            .unwrap_or(false)
    }
}
