//! Replay of recorded login attempts.
//!
//! Attempts are read as JSON lines:
//!
//! ```text
//! {"username": "alice", "outcome": "failure", "host": "203.0.113.9", "at": "2024-05-01T10:00:00Z"}
//! {"username": "alice", "outcome": "success"}
//! ```
//!
//! `host` and `at` are optional; attempts without `at` happen "now".

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_core::{
    Account, AccountStore, LoginOutcome, LoginSecuritySettings, SecurityEvent,
    memory::InMemoryAccountStore,
};

use crate::{Warden, WardenError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayAttempt {
    pub username: String,
    pub outcome: LoginOutcome,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub at: Option<DateTime<Utc>>,
}

/// Parse JSON lines, skipping blank lines.
pub fn parse_attempts(input: &str) -> Result<Vec<ReplayAttempt>, WardenError> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|e| WardenError::InvalidAttempt {
                line: index + 1,
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Read and parse an attempts file.
pub fn read_attempts(path: impl AsRef<Path>) -> Result<Vec<ReplayAttempt>, WardenError> {
    parse_attempts(&std::fs::read_to_string(path)?)
}

/// Read monitor settings from a JSON file.
pub fn read_settings(path: impl AsRef<Path>) -> Result<LoginSecuritySettings, WardenError> {
    Ok(LoginSecuritySettings::from_json(&std::fs::read_to_string(path)?)?)
}

/// Account store knowing every username that appears in `attempts`.
///
/// Usernames double as account ids.
pub fn accounts_for(attempts: &[ReplayAttempt]) -> InMemoryAccountStore {
    InMemoryAccountStore::with_accounts(
        attempts
            .iter()
            .map(|attempt| Account::new(attempt.username.as_str(), attempt.username.as_str())),
    )
}

/// Feed the attempts through `warden` in order.
///
/// # Returns
///
/// Every security event raised, in the order they were raised.
pub async fn replay<A: AccountStore>(
    warden: &Warden<A>,
    attempts: &[ReplayAttempt],
) -> Vec<SecurityEvent> {
    let mut events = Vec::new();
    for attempt in attempts {
        let now = attempt.at.unwrap_or_else(Utc::now);
        events.extend(
            warden
                .on_login_attempt(
                    &attempt.username,
                    attempt.outcome,
                    attempt.host.as_deref(),
                    now,
                )
                .await,
        );
    }
    events
}
