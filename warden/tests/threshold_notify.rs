//! Lockout and attack notifications written to the audit log

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use warden::memory::{InMemoryAccountStore, InMemoryAuditLog};
use warden::{
    Account, AccountId, AuditSeverity, LoginOutcome, LoginSecuritySettings, SecurityEvent, Warden,
    WardenBuilder,
};

fn t0() -> DateTime<Utc> {
    DateTime::from_timestamp(1_714_557_600, 0).unwrap()
}

async fn setup(
    settings: LoginSecuritySettings,
) -> (Warden<InMemoryAccountStore>, Arc<InMemoryAuditLog>) {
    let accounts = Arc::new(InMemoryAccountStore::with_accounts([
        Account::new(1u64, "alice"),
        Account::new(2u64, "bob"),
    ]));
    let log = Arc::new(InMemoryAuditLog::new());

    let warden = WardenBuilder::new()
        .with_accounts(accounts)
        .with_settings(settings)
        .with_audit_sink(log.clone())
        .build()
        .await
        .expect("Failed to build Warden");

    (warden, log)
}

async fn fail(warden: &Warden<InMemoryAccountStore>, username: &str, times: usize) -> Vec<SecurityEvent> {
    let mut events = Vec::new();
    for _ in 0..times {
        events.extend(
            warden
                .on_login_attempt(username, LoginOutcome::Failure, Some("192.0.2.10"), t0())
                .await,
        );
    }
    events
}

#[tokio::test]
async fn test_user_blocked_once_at_threshold() {
    let (warden, log) = setup(LoginSecuritySettings {
        user_wrong_count: 5,
        ..Default::default()
    })
    .await;

    let events = fail(&warden, "alice", 10).await;

    assert_eq!(events.len(), 1);
    match &events[0] {
        SecurityEvent::Blocked(blocked) => {
            assert_eq!(blocked.account.name, "alice");
            assert_eq!(blocked.failed_attempts, 5);
            assert_eq!(blocked.host.as_deref(), Some("192.0.2.10"));
        }
        other => panic!("expected blocked event, got {other:?}"),
    }

    let entries = log.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].severity, AuditSeverity::Notice);
    assert_eq!(
        entries[0].message(),
        "Blocked user alice due to security configuration."
    );

    let alice = AccountId::from(1u64);
    assert!(warden.is_locked(&alice));
    assert!(warden.processor().accounts().is_blocked(&alice));
}

#[tokio::test]
async fn test_attack_detected_before_second_user_blocked() {
    let (warden, log) = setup(LoginSecuritySettings {
        user_wrong_count: 5,
        activity_threshold: 5,
        ..Default::default()
    })
    .await;

    fail(&warden, "alice", 10).await;
    log.truncate();

    let events = fail(&warden, "bob", 10).await;
    assert_eq!(events.len(), 2);
    assert!(events[0].is_attack());
    assert!(events[1].is_blocked());

    let entries = log.entries();
    assert_eq!(entries.len(), 2);

    assert_eq!(entries[0].severity, AuditSeverity::Warning);
    assert_eq!(
        entries[0].message(),
        "Ongoing attack detected: Suspicious activity detected in login form submissions. \
         Too many invalid login attempts threshold reached: currently 6 events are tracked, \
         and threshold is configured for 5 attempts."
    );

    assert_eq!(entries[1].severity, AuditSeverity::Notice);
    assert_eq!(
        entries[1].message(),
        "Blocked user bob due to security configuration."
    );
}

#[tokio::test]
async fn test_logging_disabled_writes_nothing() {
    let (warden, log) = setup(LoginSecuritySettings {
        user_wrong_count: 2,
        activity_threshold: 1,
        log_enabled: false,
        ..Default::default()
    })
    .await;

    let events = fail(&warden, "alice", 3).await;

    assert_eq!(events.len(), 2);
    assert!(log.is_empty());
}

#[tokio::test]
async fn test_expired_failures_do_not_block() {
    let (warden, _log) = setup(LoginSecuritySettings {
        user_wrong_count: 3,
        track_time: 1,
        ..Default::default()
    })
    .await;

    for minutes in [0, 40, 80, 120] {
        let events = warden
            .on_login_attempt(
                "alice",
                LoginOutcome::Failure,
                None,
                t0() + Duration::minutes(minutes),
            )
            .await;
        assert!(events.is_empty(), "blocked at minute {minutes}");
    }
}

#[tokio::test]
async fn test_unlock_restarts_streak() {
    let (warden, log) = setup(LoginSecuritySettings {
        user_wrong_count: 3,
        ..Default::default()
    })
    .await;

    fail(&warden, "bob", 3).await;
    assert!(warden.unlock_account("bob").await.unwrap());
    assert_eq!(warden.processor().tracker().current_count(&2u64.into(), t0()), 0);

    let events = fail(&warden, "bob", 3).await;
    assert_eq!(events.len(), 1);
    assert_eq!(log.len(), 2);
}

#[tokio::test]
async fn test_settings_replaced_at_runtime() {
    let (warden, _log) = setup(LoginSecuritySettings::default()).await;
    assert!(fail(&warden, "alice", 4).await.is_empty());

    warden
        .shared_settings()
        .expect("built with fixed settings")
        .edit(|settings| settings.user_wrong_count = 5)
        .await;

    let events = fail(&warden, "alice", 1).await;
    assert_eq!(events.len(), 1);
    assert!(events[0].is_blocked());
}
