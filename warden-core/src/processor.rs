//! The login attempt entry point.
//!
//! [`LoginProcessor`] ties the tracker, the lockout policy, the attack
//! detector and the dispatcher together behind a single call a host framework
//! makes from its authentication path.
//!
//! # Example
//!
//! ```rust,ignore
//! use warden_core::{LoginOutcome, LoginProcessor};
//!
//! let processor = LoginProcessor::new(accounts, config, dispatcher);
//!
//! // After the host rejected a password
//! let events = processor
//!     .on_login_attempt("alice", LoginOutcome::Failure, Some("192.168.1.1"), Utc::now())
//!     .await;
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    Error,
    account::Account,
    attack::AttackDetector,
    dispatcher::NotificationDispatcher,
    events::SecurityEvent,
    lockout::LockoutPolicy,
    messages::{self, params},
    ports::AccountStore,
    settings::{ConfigProvider, LoginSecuritySettings},
    tracker::{AttemptTracker, LoginOutcome},
};

/// Processes login attempts against shared monitor state.
///
/// # Thread Safety
///
/// The processor is meant to be shared behind an `Arc` across request
/// handlers. Tracking and lock decisions are synchronous critical sections;
/// notifications are sent only after they complete.
pub struct LoginProcessor<A: AccountStore> {
    accounts: Arc<A>,
    config: Arc<dyn ConfigProvider>,
    tracker: AttemptTracker,
    lockout: LockoutPolicy,
    detector: AttackDetector,
    dispatcher: NotificationDispatcher,
}

impl<A: AccountStore> LoginProcessor<A> {
    pub fn new(
        accounts: Arc<A>,
        config: Arc<dyn ConfigProvider>,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        Self {
            accounts,
            config,
            tracker: AttemptTracker::default(),
            lockout: LockoutPolicy::new(),
            detector: AttackDetector::new(),
            dispatcher,
        }
    }

    pub fn accounts(&self) -> &Arc<A> {
        &self.accounts
    }

    pub fn tracker(&self) -> &AttemptTracker {
        &self.tracker
    }

    pub fn lockout(&self) -> &LockoutPolicy {
        &self.lockout
    }

    pub fn detector(&self) -> &AttackDetector {
        &self.detector
    }

    /// Current settings; unreadable configuration disables every policy.
    pub async fn settings(&self) -> LoginSecuritySettings {
        match self.config.settings().await {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(error = %e, "Login security settings unavailable, monitor disabled");
                LoginSecuritySettings::disabled()
            }
        }
    }

    async fn resolve(&self, username: &str) -> Option<Account> {
        match self.accounts.resolve(username).await {
            Ok(Some(account)) => Some(account),
            Ok(None) => {
                tracing::debug!(username = %username, "Ignoring login attempt for unknown account");
                None
            }
            Err(e) => {
                tracing::warn!(username = %username, error = %e, "Failed to resolve account");
                None
            }
        }
    }

    /// Feed one login attempt into the monitor.
    ///
    /// Never fails: unknown accounts, missing configuration and delivery
    /// problems are logged and otherwise ignored.
    ///
    /// # Returns
    ///
    /// The security events raised by this attempt, attack alerts first.
    pub async fn on_login_attempt(
        &self,
        username: &str,
        outcome: LoginOutcome,
        host: Option<&str>,
        now: DateTime<Utc>,
    ) -> Vec<SecurityEvent> {
        let Some(account) = self.resolve(username).await else {
            return Vec::new();
        };

        let settings = self.settings().await;
        self.tracker.set_window_span(settings.window_span());

        let events = match outcome {
            LoginOutcome::Success => {
                self.tracker.record_success(&account.id);
                self.lockout.unlock(&account.id);
                Vec::new()
            }
            LoginOutcome::Failure => self.track_failure(&account, host, &settings, now),
        };

        if events.iter().any(SecurityEvent::is_blocked) {
            if let Err(e) = self.accounts.block(&account.id).await {
                tracing::error!(account = %account.id, error = %e, "Failed to block account");
            }
        }

        self.notify(&events, &settings).await;
        events
    }

    fn track_failure(
        &self,
        account: &Account,
        host: Option<&str>,
        settings: &LoginSecuritySettings,
        now: DateTime<Utc>,
    ) -> Vec<SecurityEvent> {
        // the lock check, the record and the lock decision happen under the
        // account's entry; locked accounts no longer feed the counters
        let recorded = self.tracker.record_failure_with(
            &account.id,
            host,
            now,
            || self.lockout.is_locked(&account.id),
            |count| {
                self.lockout
                    .evaluate(account, count, settings.user_wrong_count, host, now)
            },
        );
        let Some((count, blocked)) = recorded else {
            tracing::debug!(account = %account.id, "Ignoring failed attempt for locked account");
            return Vec::new();
        };
        tracing::debug!(account = %account.id, count = count, "Recorded failed login attempt");

        let mut events = Vec::new();

        let (subsided, attack) = self.detector.observe(
            || self.tracker.global_count(now),
            settings.activity_threshold,
        );
        if let Some(subsided) = subsided {
            events.push(SecurityEvent::AttackSubsided(subsided));
        }
        if let Some(attack) = attack {
            events.push(SecurityEvent::AttackDetected(attack));
        }
        if let Some(blocked) = blocked {
            events.push(SecurityEvent::Blocked(blocked));
        }

        events
    }

    async fn notify(&self, events: &[SecurityEvent], settings: &LoginSecuritySettings) {
        for event in events {
            let config = settings.notification_config(event);
            self.dispatcher
                .dispatch(event, &config, &settings.site_name)
                .await;
        }
    }

    /// Administrative reset: clear the lock and the tracked failures.
    ///
    /// # Returns
    ///
    /// `true` if the account was locked before.
    pub async fn unlock(&self, username: &str) -> Result<bool, Error> {
        let account = self
            .accounts
            .resolve(username)
            .await?
            .ok_or_else(|| crate::error::AccountError::NotFound(username.to_string()))?;

        self.tracker.clear_account(&account.id);
        Ok(self.lockout.unlock(&account.id))
    }

    /// Attempts left before the account gets locked, `None` if lockout is
    /// disabled or the account is unknown.
    pub async fn attempts_remaining(&self, username: &str, now: DateTime<Utc>) -> Option<u32> {
        let account = self.resolve(username).await?;
        let threshold = u32::try_from(self.settings().await.user_wrong_count)
            .ok()
            .filter(|t| *t > 0)?;

        let used = self.tracker.current_count(&account.id, now);
        Some(threshold.saturating_sub(used))
    }

    /// Notice for the login form telling the user how many attempts they used.
    pub async fn attempts_notice(&self, username: &str, now: DateTime<Utc>) -> Option<String> {
        let account = self.resolve(username).await?;
        let threshold = self.settings().await.user_wrong_count;
        if threshold <= 0 {
            return None;
        }

        let used = self.tracker.current_count(&account.id, now);
        Some(messages::format_message(
            messages::ATTEMPTS_NOTICE,
            &params([
                ("@user_current_count", used.to_string()),
                ("@user_block_attempts", threshold.to_string()),
            ]),
        ))
    }

    /// Evict expired records and clear a stale attack alert.
    ///
    /// Meant to be called periodically; returns the subsiding event if the
    /// attack alert was cleared.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Vec<SecurityEvent> {
        let settings = self.settings().await;
        self.tracker.set_window_span(settings.window_span());

        let evicted = self.tracker.sweep(now);
        if evicted > 0 {
            tracing::info!(count = evicted, "Evicted expired login attempt records");
        }

        let global = self.tracker.global_count(now);
        let events: Vec<_> = self
            .detector
            .settle(global, settings.activity_threshold)
            .map(SecurityEvent::AttackSubsided)
            .into_iter()
            .collect();

        self.notify(&events, &settings).await;
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::NotificationError,
        memory::{InMemoryAccountStore, InMemoryAuditLog, InMemoryMailSink},
        ports::MailSink,
        settings::SharedConfigProvider,
    };
    use async_trait::async_trait;
    use chrono::Duration;

    struct Harness {
        processor: LoginProcessor<InMemoryAccountStore>,
        config: SharedConfigProvider,
        log: Arc<InMemoryAuditLog>,
        mail: Arc<InMemoryMailSink>,
    }

    fn harness(settings: LoginSecuritySettings) -> Harness {
        let accounts = Arc::new(InMemoryAccountStore::with_accounts([
            Account::new(1u64, "alice"),
            Account::new(2u64, "bob"),
        ]));
        let config = SharedConfigProvider::new(settings);
        let log = Arc::new(InMemoryAuditLog::new());
        let mail = Arc::new(InMemoryMailSink::new());
        let dispatcher = NotificationDispatcher::new(log.clone()).with_mail_sink(mail.clone());

        Harness {
            processor: LoginProcessor::new(accounts, Arc::new(config.clone()), dispatcher),
            config,
            log,
            mail,
        }
    }

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn thresholds(lockout: i64, activity: i64) -> LoginSecuritySettings {
        LoginSecuritySettings {
            user_wrong_count: lockout,
            activity_threshold: activity,
            ..Default::default()
        }
    }

    async fn fail(h: &Harness, username: &str, times: usize) -> Vec<SecurityEvent> {
        let mut events = Vec::new();
        for _ in 0..times {
            events.extend(
                h.processor
                    .on_login_attempt(username, LoginOutcome::Failure, None, t0())
                    .await,
            );
        }
        events
    }

    #[tokio::test]
    async fn test_single_block_at_threshold() {
        let h = harness(thresholds(5, 0));

        for i in 1..=10 {
            let events = h
                .processor
                .on_login_attempt("alice", LoginOutcome::Failure, None, t0())
                .await;
            if i == 5 {
                assert_eq!(events.len(), 1);
                assert!(events[0].is_blocked());
            } else {
                assert!(events.is_empty(), "unexpected events at attempt {i}");
            }
        }

        assert!(h.processor.accounts().is_blocked(&"1".into()));
        assert_eq!(h.log.len(), 1);
    }

    #[tokio::test]
    async fn test_locked_account_stops_counting() {
        let h = harness(thresholds(5, 0));
        fail(&h, "alice", 10).await;

        assert_eq!(h.processor.tracker().current_count(&"1".into(), t0()), 5);
        assert_eq!(h.processor.tracker().global_count(t0()), 5);
    }

    #[tokio::test]
    async fn test_attack_then_block_ordering() {
        let h = harness(thresholds(5, 5));

        let first = fail(&h, "alice", 10).await;
        assert_eq!(first.len(), 1);
        assert!(first[0].is_blocked());
        h.log.truncate();

        let second = fail(&h, "bob", 10).await;
        assert_eq!(second.len(), 2);
        match &second[0] {
            SecurityEvent::AttackDetected(attack) => {
                assert_eq!(attack.current_count, 6);
                assert_eq!(attack.threshold, 5);
            }
            other => panic!("expected attack event, got {other:?}"),
        }
        assert!(second[1].is_blocked());
        assert_eq!(h.log.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_account_is_ignored() {
        let h = harness(thresholds(1, 1));

        let events = fail(&h, "mallory", 5).await;

        assert!(events.is_empty());
        assert_eq!(h.processor.tracker().global_count(t0()), 0);
    }

    #[tokio::test]
    async fn test_success_clears_window_and_lock() {
        let h = harness(thresholds(3, 0));
        fail(&h, "alice", 3).await;
        assert!(h.processor.lockout().is_locked(&"1".into()));

        h.processor
            .on_login_attempt("alice", LoginOutcome::Success, None, t0())
            .await;

        assert!(!h.processor.lockout().is_locked(&"1".into()));
        assert_eq!(h.processor.tracker().current_count(&"1".into(), t0()), 0);
    }

    #[tokio::test]
    async fn test_unlock_then_block_again() {
        let h = harness(thresholds(5, 0));
        fail(&h, "alice", 7).await;

        assert!(h.processor.unlock("alice").await.unwrap());
        assert!(!h.processor.unlock("alice").await.unwrap());

        let events = fail(&h, "alice", 5).await;
        assert_eq!(events.iter().filter(|e| e.is_blocked()).count(), 1);
    }

    #[tokio::test]
    async fn test_unlock_unknown_account() {
        let h = harness(thresholds(5, 0));
        let err = h.processor.unlock("mallory").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_zero_thresholds_never_fire() {
        let h = harness(thresholds(0, 0));
        let events = fail(&h, "alice", 50).await;

        assert!(events.is_empty());
        assert!(h.log.is_empty());
        assert_eq!(h.processor.tracker().current_count(&"1".into(), t0()), 50);
    }

    #[tokio::test]
    async fn test_failures_outside_window_do_not_count() {
        let h = harness(thresholds(3, 0));

        for hour in 0..5 {
            let events = h
                .processor
                .on_login_attempt(
                    "alice",
                    LoginOutcome::Failure,
                    None,
                    t0() + Duration::hours(hour),
                )
                .await;
            assert!(events.is_empty());
        }
    }

    #[tokio::test]
    async fn test_blocked_mail_goes_to_configured_recipients() {
        let h = harness(LoginSecuritySettings {
            user_blocked_notification_emails: "test@test.com".to_string(),
            site_name: "Example".to_string(),
            ..thresholds(2, 0)
        });

        fail(&h, "bob", 2).await;

        let sent = h.mail.sent_to("test@test.com");
        assert_eq!(sent.len(), 1);
        assert!(sent[0].body.contains("bob has been blocked at Example"));
    }

    #[tokio::test]
    async fn test_settings_hot_reload() {
        let h = harness(thresholds(0, 0));
        assert!(fail(&h, "alice", 3).await.is_empty());

        h.config.edit(|s| s.user_wrong_count = 4).await;

        let events = fail(&h, "alice", 1).await;
        assert_eq!(events.len(), 1);
        assert!(events[0].is_blocked());
    }

    #[tokio::test]
    async fn test_attempts_remaining_and_notice() {
        let h = harness(thresholds(5, 0));
        fail(&h, "alice", 2).await;

        assert_eq!(h.processor.attempts_remaining("alice", t0()).await, Some(3));
        assert_eq!(
            h.processor.attempts_notice("alice", t0()).await.unwrap(),
            "You have used 2 out of 5 login attempts. After all 5 have been used, you will be unable to login."
        );
        assert_eq!(h.processor.attempts_remaining("mallory", t0()).await, None);
    }

    #[tokio::test]
    async fn test_attempts_remaining_disabled() {
        let h = harness(thresholds(0, 0));
        assert_eq!(h.processor.attempts_remaining("alice", t0()).await, None);
        assert!(h.processor.attempts_notice("alice", t0()).await.is_none());
    }

    #[tokio::test]
    async fn test_sweep_reports_subsided_attack() {
        let h = harness(thresholds(0, 3));
        let events = fail(&h, "alice", 4).await;
        assert!(events[0].is_attack());
        assert!(h.processor.detector().is_active());

        let events = h.processor.sweep(t0() + Duration::hours(2)).await;

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], SecurityEvent::AttackSubsided(_)));
        assert!(!h.processor.detector().is_active());
        assert_eq!(h.log.len(), 2);
    }

    struct BrokenMail;

    #[async_trait]
    impl MailSink for BrokenMail {
        async fn send(
            &self,
            to: &str,
            _: &str,
            _: &str,
            _: &str,
        ) -> Result<(), NotificationError> {
            Err(NotificationError::MailDelivery {
                recipient: to.to_string(),
                reason: "smtp down".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_mail_failure_does_not_affect_login_path() {
        let accounts = Arc::new(InMemoryAccountStore::with_accounts([Account::new(
            1u64, "alice",
        )]));
        let config = SharedConfigProvider::new(LoginSecuritySettings {
            user_blocked_notification_emails: "test@test.com".to_string(),
            ..thresholds(1, 0)
        });
        let log = Arc::new(InMemoryAuditLog::new());
        let dispatcher = NotificationDispatcher::new(log.clone()).with_mail_sink(Arc::new(BrokenMail));
        let processor = LoginProcessor::new(accounts.clone(), Arc::new(config), dispatcher);

        let events = processor
            .on_login_attempt("alice", LoginOutcome::Failure, None, t0())
            .await;

        assert_eq!(events.len(), 1);
        assert!(accounts.is_blocked(&"1".into()));
        assert_eq!(log.len(), 1);
    }
}
