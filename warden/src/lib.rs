//! # Warden
//!
//! Warden watches the login attempts of an application and reacts to abuse:
//!
//! - accounts that fail to log in too often within a time window are blocked
//! - a burst of failed attempts across all accounts raises an attack alert
//! - both are written to an audit log and mailed to configured recipients
//!
//! The host application keeps its accounts. It implements
//! [`AccountStore`] and calls [`Warden::on_login_attempt`] from its
//! authentication path.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use warden::{Account, LoginSecuritySettings, WardenBuilder};
//! use warden::memory::InMemoryAccountStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let accounts = Arc::new(InMemoryAccountStore::with_accounts([
//!         Account::new(1u64, "alice"),
//!     ]));
//!
//!     let warden = WardenBuilder::new()
//!         .with_accounts(accounts)
//!         .with_settings(LoginSecuritySettings {
//!             user_wrong_count: 5,
//!             activity_threshold: 20,
//!             ..Default::default()
//!         })
//!         .build()
//!         .await?;
//!
//!     let events = warden.record_login_failure("alice", Some("203.0.113.9")).await;
//!     assert!(events.is_empty());
//!     Ok(())
//! }
//! ```
use std::sync::Arc;

use chrono::{DateTime, Utc};

pub mod builder;
mod error;
#[cfg(feature = "mailer")]
pub mod mailer_sink;
pub mod replay;

pub use builder::{NoAccounts, WardenBuilder, WithAccounts};
pub use error::{WardenBuilderError, WardenError};
#[cfg(feature = "mailer")]
pub use mailer_sink::MailerSink;

/// Re-export core types from warden_core
pub use warden_core::{
    Account, AccountId, AccountStore, AttackEvent, AuditSeverity, AuditSink, BlockedEvent,
    ConfigProvider, LoginOutcome, LoginProcessor, LoginSecuritySettings, MailSink,
    NotificationDispatcher, SecurityEvent, SharedConfigProvider, memory, messages,
};
pub use warden_core::error::NotificationError;

#[cfg(feature = "mailer")]
pub use warden_mailer::{MailerConfig, config::TransportConfig};

/// Sweep interval used when none is configured.
pub const DEFAULT_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(300);

/// The login security monitor.
///
/// Cheap to clone; clones share all tracked state.
pub struct Warden<A: AccountStore> {
    processor: Arc<LoginProcessor<A>>,
    shared_settings: Option<SharedConfigProvider>,
}

impl<A: AccountStore> Clone for Warden<A> {
    fn clone(&self) -> Self {
        Self {
            processor: Arc::clone(&self.processor),
            shared_settings: self.shared_settings.clone(),
        }
    }
}

impl<A: AccountStore> Warden<A> {
    pub fn new(processor: LoginProcessor<A>) -> Self {
        Self {
            processor: Arc::new(processor),
            shared_settings: None,
        }
    }

    pub(crate) fn with_shared_settings(mut self, settings: SharedConfigProvider) -> Self {
        self.shared_settings = Some(settings);
        self
    }

    pub fn processor(&self) -> &LoginProcessor<A> {
        &self.processor
    }

    /// Handle for replacing the settings at runtime, if the instance was
    /// built with [`WardenBuilder::with_settings`].
    pub fn shared_settings(&self) -> Option<&SharedConfigProvider> {
        self.shared_settings.as_ref()
    }

    /// Feed one login attempt into the monitor at an explicit time.
    pub async fn on_login_attempt(
        &self,
        username: &str,
        outcome: LoginOutcome,
        host: Option<&str>,
        now: DateTime<Utc>,
    ) -> Vec<SecurityEvent> {
        self.processor
            .on_login_attempt(username, outcome, host, now)
            .await
    }

    /// Record a rejected login happening now.
    pub async fn record_login_failure(
        &self,
        username: &str,
        host: Option<&str>,
    ) -> Vec<SecurityEvent> {
        self.on_login_attempt(username, LoginOutcome::Failure, host, Utc::now())
            .await
    }

    /// Record a successful login happening now.
    pub async fn record_login_success(&self, username: &str, host: Option<&str>) {
        self.on_login_attempt(username, LoginOutcome::Success, host, Utc::now())
            .await;
    }

    /// Lift a lock and forget the account's failed attempts.
    ///
    /// The host is responsible for re-activating the account on its side.
    pub async fn unlock_account(&self, username: &str) -> Result<bool, WardenError> {
        Ok(self.processor.unlock(username).await?)
    }

    pub fn is_locked(&self, account: &AccountId) -> bool {
        self.processor.lockout().is_locked(account)
    }

    pub async fn attempts_remaining(&self, username: &str) -> Option<u32> {
        self.processor.attempts_remaining(username, Utc::now()).await
    }

    /// Message for the login form, e.g. after a rejected password.
    pub async fn attempts_notice(&self, username: &str) -> Option<String> {
        self.processor.attempts_notice(username, Utc::now()).await
    }

    pub async fn sweep(&self) -> Vec<SecurityEvent> {
        self.processor.sweep(Utc::now()).await
    }

    /// Start the background sweep task.
    ///
    /// The task periodically evicts expired attempt records and clears a
    /// stale attack alert.
    ///
    /// # Arguments
    ///
    /// * `interval` - Time between sweeps
    /// * `shutdown` - A watch receiver that signals when to stop the task
    pub fn start_sweep_task(
        &self,
        interval: std::time::Duration,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let processor = Arc::clone(&self.processor);

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        let events = processor.sweep(Utc::now()).await;
                        if !events.is_empty() {
                            tracing::info!(count = events.len(), "Sweep raised security events");
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Shutting down login security sweep task");
                        break;
                    }
                }
            }
        })
    }
}
