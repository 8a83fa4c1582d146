//! Core functionality for the warden login security monitor
//!
//! This crate contains the monitor itself: rolling failed-attempt tracking,
//! account lockout, aggregate attack detection and the dispatch of the
//! resulting security events to an audit log and to mail recipients.
//!
//! The host application is reached through the [`ports`]: it resolves and
//! blocks accounts, supplies settings, and stores audit entries and mails.
//!
//! See [`LoginProcessor`] for the entry point, and [`SecurityEvent`] for what it emits.
//!
pub mod account;
pub mod attack;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod lockout;
pub mod memory;
pub mod messages;
pub mod ports;
pub mod processor;
pub mod settings;
pub mod tracker;

pub use account::{Account, AccountId};
pub use attack::{AttackAlertState, AttackDetector};
pub use dispatcher::NotificationDispatcher;
pub use error::Error;
pub use events::{AttackEvent, AuditSeverity, BlockedEvent, SecurityEvent};
pub use lockout::{LockoutPolicy, LockoutState};
pub use ports::{AccountStore, AuditSink, MailSink};
pub use processor::LoginProcessor;
pub use settings::{
    ConfigProvider, LoginSecuritySettings, NotificationConfig, SharedConfigProvider,
};
pub use tracker::{AttemptRecord, AttemptTracker, LoginOutcome};
