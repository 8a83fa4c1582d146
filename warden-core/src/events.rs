use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    account::Account,
    messages::{self, MessageParams, params},
};

/// Severity of an audit entry, following the syslog levels the audit log uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSeverity {
    Warning,
    Notice,
}

impl std::fmt::Display for AuditSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditSeverity::Warning => write!(f, "warning"),
            AuditSeverity::Notice => write!(f, "notice"),
        }
    }
}

/// An account crossed the failed-attempt threshold and was locked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedEvent {
    pub account: Account,
    /// Failures in the tracking window when the lock was set
    pub failed_attempts: u32,
    /// Source of the attempt that triggered the lock
    pub host: Option<String>,
    pub locked_at: DateTime<Utc>,
}

/// Global failure count compared against the activity threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackEvent {
    pub current_count: u32,
    pub threshold: u32,
}

/// Represents the security events emitted by the monitor
///
/// Each event is produced once per triggering condition and handed to the
/// [`NotificationDispatcher`](crate::dispatcher::NotificationDispatcher)
/// exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SecurityEvent {
    /// An account was locked after too many failed attempts.
    Blocked(BlockedEvent),

    /// The global failure count went over the activity threshold.
    ///
    /// This is a security-critical event that should trigger alerts.
    AttackDetected(AttackEvent),

    /// A previously detected attack is no longer observed.
    AttackSubsided(AttackEvent),
}

impl SecurityEvent {
    pub fn severity(&self) -> AuditSeverity {
        match self {
            SecurityEvent::AttackDetected(_) => AuditSeverity::Warning,
            SecurityEvent::Blocked(_) | SecurityEvent::AttackSubsided(_) => AuditSeverity::Notice,
        }
    }

    /// Unformatted audit log template.
    pub fn log_template(&self) -> &'static str {
        match self {
            SecurityEvent::Blocked(_) => messages::BLOCKED_USER,
            SecurityEvent::AttackDetected(_) => messages::ATTACK_DETECTED,
            SecurityEvent::AttackSubsided(_) => messages::ATTACK_SUBSIDED,
        }
    }

    /// Placeholder values for the event's templates.
    pub fn params(&self) -> MessageParams {
        match self {
            SecurityEvent::Blocked(blocked) => params([("@username", &blocked.account.name)]),
            SecurityEvent::AttackDetected(attack) | SecurityEvent::AttackSubsided(attack) => {
                params([
                    ("@tracking_current_count", attack.current_count),
                    ("@activity_threshold", attack.threshold),
                ])
            }
        }
    }

    /// The rendered audit log message.
    pub fn log_message(&self) -> String {
        messages::format_message(self.log_template(), &self.params())
    }

    /// Subject and body of the alert mail, `None` for events that are only logged.
    pub fn mail_content(&self, site_name: &str) -> Option<(String, String)> {
        let (subject, body) = match self {
            SecurityEvent::Blocked(_) => (
                messages::BLOCKED_USER_MAIL_SUBJECT,
                messages::BLOCKED_USER_MAIL_BODY,
            ),
            SecurityEvent::AttackDetected(_) => {
                (messages::ATTACK_MAIL_SUBJECT, messages::ATTACK_MAIL_BODY)
            }
            SecurityEvent::AttackSubsided(_) => return None,
        };

        let mut params = self.params();
        params.insert("@site".to_string(), site_name.to_string());

        Some((
            messages::format_message(subject, &params),
            messages::format_message(body, &params),
        ))
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, SecurityEvent::Blocked(_))
    }

    pub fn is_attack(&self) -> bool {
        matches!(self, SecurityEvent::AttackDetected(_))
    }
}
