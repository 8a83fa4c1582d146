//! In-memory port implementations.
//!
//! Useful for development, for the CLI replay and for tests. Production hosts
//! implement the [`ports`](crate::ports) against their own storage.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    account::{Account, AccountId},
    error::NotificationError,
    events::AuditSeverity,
    messages::{MessageParams, format_message},
    ports::{AccountStore, AuditSink, MailSink},
};

/// Accounts kept in a map, resolvable by name or by id.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    by_name: DashMap<String, Account>,
    by_id: DashMap<AccountId, Account>,
    blocked: DashSet<AccountId>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with the given accounts already inserted.
    pub fn with_accounts<I: IntoIterator<Item = Account>>(accounts: I) -> Self {
        let store = Self::new();
        for account in accounts {
            store.insert(account);
        }
        store
    }

    pub fn insert(&self, account: Account) {
        self.by_name.insert(account.name.clone(), account.clone());
        self.by_id.insert(account.id.clone(), account);
    }

    pub fn is_blocked(&self, account: &AccountId) -> bool {
        self.blocked.contains(account)
    }

    /// Re-enable a blocked account.
    pub fn activate(&self, account: &AccountId) -> bool {
        self.blocked.remove(account).is_some()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn resolve(&self, username_or_id: &str) -> Result<Option<Account>, Error> {
        if let Some(account) = self.by_name.get(username_or_id) {
            return Ok(Some(account.clone()));
        }
        Ok(self
            .by_id
            .get(&AccountId::new(username_or_id))
            .map(|account| account.clone()))
    }

    async fn block(&self, account: &AccountId) -> Result<(), Error> {
        self.blocked.insert(account.clone());
        Ok(())
    }
}

/// A stored audit log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub severity: AuditSeverity,
    pub template: String,
    pub params: MessageParams,
    pub logged_at: DateTime<Utc>,
}

impl AuditEntry {
    /// The entry's template with its parameters substituted.
    pub fn message(&self) -> String {
        format_message(&self.template, &self.params)
    }
}

/// Audit log kept in memory, oldest entry first.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all entries.
    pub fn truncate(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditLog {
    async fn write(
        &self,
        severity: AuditSeverity,
        template: &str,
        params: &MessageParams,
    ) -> Result<(), NotificationError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(AuditEntry {
                severity,
                template: template.to_string(),
                params: params.clone(),
                logged_at: Utc::now(),
            });
        Ok(())
    }
}

/// Audit sink that writes entries as tracing events under the
/// `login_security` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn write(
        &self,
        severity: AuditSeverity,
        template: &str,
        params: &MessageParams,
    ) -> Result<(), NotificationError> {
        let message = format_message(template, params);
        match severity {
            AuditSeverity::Warning => {
                tracing::warn!(target: "login_security", severity = %severity, "{message}")
            }
            AuditSeverity::Notice => {
                tracing::info!(target: "login_security", severity = %severity, "{message}")
            }
        }
        Ok(())
    }
}

/// A mail captured by [`InMemoryMailSink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub site_name: String,
}

/// Mail sink that keeps every mail instead of delivering it.
#[derive(Debug, Default)]
pub struct InMemoryMailSink {
    sent: Mutex<Vec<SentMail>>,
}

impl InMemoryMailSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Mails sent to one recipient.
    pub fn sent_to(&self, to: &str) -> Vec<SentMail> {
        self.sent().into_iter().filter(|mail| mail.to == to).collect()
    }
}

#[async_trait]
impl MailSink for InMemoryMailSink {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        site_name: &str,
    ) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentMail {
                to: to.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
                site_name: site_name.to_string(),
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{BLOCKED_USER, params};

    #[tokio::test]
    async fn test_account_store_resolves_name_and_id() {
        let store = InMemoryAccountStore::with_accounts([Account::new(7u64, "alice")]);

        let by_name = store.resolve("alice").await.unwrap().unwrap();
        let by_id = store.resolve("7").await.unwrap().unwrap();
        assert_eq!(by_name, by_id);
        assert!(store.resolve("mallory").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_account_store_block_and_activate() {
        let store = InMemoryAccountStore::with_accounts([Account::new(7u64, "alice")]);
        let id = AccountId::from(7u64);

        store.block(&id).await.unwrap();
        assert!(store.is_blocked(&id));
        assert!(store.activate(&id));
        assert!(!store.is_blocked(&id));
    }

    #[tokio::test]
    async fn test_audit_log_keeps_template_and_params() {
        let log = InMemoryAuditLog::new();
        log.write(
            AuditSeverity::Notice,
            BLOCKED_USER,
            &params([("@username", "alice")]),
        )
        .await
        .unwrap();

        let entries = log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].template, BLOCKED_USER);
        assert_eq!(
            entries[0].message(),
            "Blocked user alice due to security configuration."
        );

        log.truncate();
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_mail_sink_records_mails() {
        let sink = InMemoryMailSink::new();
        sink.send("test@test.com", "subject", "body", "Site").await.unwrap();
        sink.send("other@test.com", "subject", "body", "Site").await.unwrap();

        assert_eq!(sink.sent().len(), 2);
        assert_eq!(sink.sent_to("test@test.com").len(), 1);
    }

    #[tokio::test]
    async fn test_tracing_sink_never_fails() {
        let sink = TracingAuditSink;
        let result = sink
            .write(
                AuditSeverity::Warning,
                "@what happened",
                &params([("@what", "something")]),
            )
            .await;
        assert!(result.is_ok());
    }
}
