//! Rolling failed-attempt tracking.
//!
//! Failures are kept per account in a sharded map and mirrored into one
//! global window. Both are evicted against the same cutoff, so the global
//! count always equals the sum of the per-account counts.
//!
//! # Locking
//!
//! An account's shard lock is always taken before the global lock. No method
//! takes an account lock while already holding the global one.

use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard, PoisonError, RwLock},
};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::account::AccountId;

/// Result of a login attempt as reported by the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginOutcome {
    Success,
    Failure,
}

/// A single tracked login attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub account: AccountId,
    pub timestamp: DateTime<Utc>,
    pub outcome: LoginOutcome,
    pub host: Option<String>,
}

#[derive(Debug, Default)]
struct GlobalActivity {
    records: VecDeque<(DateTime<Utc>, AccountId)>,
}

impl GlobalActivity {
    fn evict(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.records.len();
        self.records.retain(|(at, _)| *at > cutoff);
        before - self.records.len()
    }
}

/// Tracks failed login attempts per account and across all accounts.
///
/// All time comparisons use the `now` supplied by the caller. A record is
/// inside the window while `timestamp > now - window_span`.
#[derive(Debug)]
pub struct AttemptTracker {
    accounts: DashMap<AccountId, VecDeque<AttemptRecord>>,
    global: Mutex<GlobalActivity>,
    window_span: RwLock<Duration>,
}

impl Default for AttemptTracker {
    fn default() -> Self {
        Self::new(Duration::hours(1))
    }
}

impl AttemptTracker {
    pub fn new(window_span: Duration) -> Self {
        Self {
            accounts: DashMap::new(),
            global: Mutex::new(GlobalActivity::default()),
            window_span: RwLock::new(window_span),
        }
    }

    pub fn window_span(&self) -> Duration {
        *self
            .window_span
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Change the window length. Existing records are evicted against the new
    /// span the next time they are read.
    pub fn set_window_span(&self, span: Duration) {
        let mut current = self
            .window_span
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if *current != span {
            let previous = *current;
            tracing::debug!(from = %previous, to = %span, "Tracking window span changed");
            *current = span;
        }
    }

    fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.window_span()
    }

    fn lock_global(&self) -> MutexGuard<'_, GlobalActivity> {
        self.global.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a failed attempt and return the account's count inside the window.
    pub fn record_failure(
        &self,
        account: &AccountId,
        host: Option<&str>,
        now: DateTime<Utc>,
    ) -> u32 {
        self.record_failure_with(account, host, now, || false, |_| ())
            .map_or(0, |(count, ())| count)
    }

    /// Record a failed attempt as one critical section on the account.
    ///
    /// While the account's entry is held: `skip` is checked first and, if it
    /// returns `true`, nothing is recorded. Otherwise the failure is recorded
    /// and `decide` runs with the new count. Both closures must not touch this
    /// tracker.
    ///
    /// # Returns
    ///
    /// `None` if skipped, else the count and the result of `decide`.
    pub fn record_failure_with<S, D, R>(
        &self,
        account: &AccountId,
        host: Option<&str>,
        now: DateTime<Utc>,
        skip: S,
        decide: D,
    ) -> Option<(u32, R)>
    where
        S: FnOnce() -> bool,
        D: FnOnce(u32) -> R,
    {
        let cutoff = self.cutoff(now);
        let mut window = self.accounts.entry(account.clone()).or_default();
        if skip() {
            return None;
        }

        window.push_back(AttemptRecord {
            account: account.clone(),
            timestamp: now,
            outcome: LoginOutcome::Failure,
            host: host.map(str::to_string),
        });
        window.retain(|r| r.timestamp > cutoff);

        {
            let mut global = self.lock_global();
            global.records.push_back((now, account.clone()));
            global.evict(cutoff);
        }

        let count = window.len() as u32;
        Some((count, decide(count)))
    }

    /// Clear the account's window after a successful login.
    pub fn record_success(&self, account: &AccountId) {
        self.clear_account(account);
    }

    /// Drop every tracked failure of an account, including its share of the
    /// global count. Returns the number of records removed.
    pub fn clear_account(&self, account: &AccountId) -> u32 {
        let removed = match self.accounts.get_mut(account) {
            Some(mut window) => {
                let removed = window.len();
                window.clear();
                self.lock_global().records.retain(|(_, id)| id != account);
                removed
            }
            None => 0,
        };
        self.accounts.remove_if(account, |_, window| window.is_empty());
        removed as u32
    }

    /// Failures of an account inside the window.
    pub fn current_count(&self, account: &AccountId, now: DateTime<Utc>) -> u32 {
        let cutoff = self.cutoff(now);
        match self.accounts.get_mut(account) {
            Some(mut window) => {
                window.retain(|r| r.timestamp > cutoff);
                window.len() as u32
            }
            None => 0,
        }
    }

    /// Failures of all accounts inside the window.
    pub fn global_count(&self, now: DateTime<Utc>) -> u32 {
        let cutoff = self.cutoff(now);
        let mut global = self.lock_global();
        global.evict(cutoff);
        global.records.len() as u32
    }

    /// Tracked records of an account, oldest first.
    pub fn records(&self, account: &AccountId) -> Vec<AttemptRecord> {
        self.accounts
            .get(account)
            .map(|window| window.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Evict expired records of every account. Returns the number of evicted failures.
    pub fn sweep(&self, now: DateTime<Utc>) -> u32 {
        let cutoff = self.cutoff(now);
        self.accounts.retain(|_, window| {
            window.retain(|r| r.timestamp > cutoff);
            !window.is_empty()
        });
        self.lock_global().evict(cutoff) as u32
    }

    /// Forget everything.
    pub fn clear(&self) {
        self.accounts.clear();
        self.lock_global().records.clear();
    }
}
