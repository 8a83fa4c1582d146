//! Account lockout decisions.

use chrono::{DateTime, Utc};
use dashmap::{DashMap, mapref::entry::Entry};

use crate::{
    account::{Account, AccountId},
    events::BlockedEvent,
};

/// Lock recorded for an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockoutState {
    pub locked_at: DateTime<Utc>,
    pub failed_attempts: u32,
}

/// Decides when an account must be locked and remembers the lock.
///
/// Blocking is idempotent: an account fires one [`BlockedEvent`] per streak
/// and stays silent until [`unlock`](Self::unlock) is called.
#[derive(Debug, Default)]
pub struct LockoutPolicy {
    locks: DashMap<AccountId, LockoutState>,
}

impl LockoutPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether `account` must be locked.
    ///
    /// Fires when `failure_count >= threshold` and the account is not locked
    /// yet. The check and the lock happen under the same map entry lock, so two
    /// concurrent evaluations for one account cannot both fire. A threshold of
    /// zero or below disables the policy.
    pub fn evaluate(
        &self,
        account: &Account,
        failure_count: u32,
        threshold: i64,
        host: Option<&str>,
        now: DateTime<Utc>,
    ) -> Option<BlockedEvent> {
        if threshold <= 0 || i64::from(failure_count) < threshold {
            return None;
        }

        match self.locks.entry(account.id.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(entry) => {
                entry.insert(LockoutState {
                    locked_at: now,
                    failed_attempts: failure_count,
                });

                tracing::info!(
                    account = %account.id,
                    failed_attempts = failure_count,
                    threshold = threshold,
                    "Account locked after too many failed login attempts"
                );

                Some(BlockedEvent {
                    account: account.clone(),
                    failed_attempts: failure_count,
                    host: host.map(str::to_string),
                    locked_at: now,
                })
            }
        }
    }

    pub fn is_locked(&self, account: &AccountId) -> bool {
        self.locks.contains_key(account)
    }

    pub fn state(&self, account: &AccountId) -> Option<LockoutState> {
        self.locks.get(account).map(|state| state.clone())
    }

    /// Clear the lock of an account.
    ///
    /// Returns `true` if the account was previously locked, `false` otherwise.
    pub fn unlock(&self, account: &AccountId) -> bool {
        let was_locked = self.locks.remove(account).is_some();
        if was_locked {
            tracing::info!(account = %account, "Account unlocked");
        }
        was_locked
    }

    /// All currently locked accounts, in no particular order.
    pub fn locked_accounts(&self) -> Vec<AccountId> {
        self.locks.iter().map(|entry| entry.key().clone()).collect()
    }
}
