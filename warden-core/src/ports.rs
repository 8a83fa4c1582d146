//! Ports to the host application
//!
//! The monitor does not own accounts, the audit log or the mail transport.
//! It talks to them through these traits, which a host framework implements
//! on top of its own storage and services.
//!
//! In-memory implementations live in [`crate::memory`].

use async_trait::async_trait;

use crate::{
    Error,
    account::{Account, AccountId},
    error::NotificationError,
    events::AuditSeverity,
    messages::MessageParams,
};

/// Access to the host's accounts.
#[async_trait]
pub trait AccountStore: Send + Sync + 'static {
    /// Resolve a username or account id.
    ///
    /// # Returns
    ///
    /// `None` if no such account exists. Attempts against unknown accounts
    /// are not tracked.
    async fn resolve(&self, username_or_id: &str) -> Result<Option<Account>, Error>;

    /// Block the account in the host so it can no longer authenticate.
    ///
    /// Called once per lockout, after the [`BlockedEvent`](crate::events::BlockedEvent)
    /// has been decided.
    async fn block(&self, account: &AccountId) -> Result<(), Error>;
}

/// Destination of audit log entries.
///
/// Entries keep the unformatted template and its parameters apart so the
/// backend can store them the way a watchdog table does.
#[async_trait]
pub trait AuditSink: Send + Sync + 'static {
    async fn write(
        &self,
        severity: AuditSeverity,
        template: &str,
        params: &MessageParams,
    ) -> Result<(), NotificationError>;
}

/// Outgoing mail.
///
/// `site_name` is the name the rendered alert was produced for, read from the
/// settings current at dispatch time.
#[async_trait]
pub trait MailSink: Send + Sync + 'static {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        site_name: &str,
    ) -> Result<(), NotificationError>;
}
