//! Login security settings and the configuration port.
//!
//! Settings are read once per evaluation through a [`ConfigProvider`], so a
//! provider backed by a database or a file can be swapped in without touching
//! the monitor. [`SharedConfigProvider`] is the in-process default and can be
//! updated at runtime.

use std::{collections::BTreeSet, sync::Arc};

use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{
    Error,
    error::ConfigError,
    events::SecurityEvent,
};

/// The enumerated option set of the login security monitor.
///
/// Thresholds of zero or below disable the corresponding policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginSecuritySettings {
    /// Failed attempts after which an account is locked
    pub user_wrong_count: i64,
    /// Global failed attempts over which an ongoing attack is reported
    pub activity_threshold: i64,
    /// Length of the tracking window, in hours
    pub track_time: i64,
    /// Recipients of "user blocked" mails, comma or whitespace separated
    pub user_blocked_notification_emails: String,
    /// Recipients of "ongoing attack" mails, comma or whitespace separated
    pub login_activity_notification_emails: String,
    /// Whether events are written to the audit log
    pub log_enabled: bool,
    /// Site name used in mails
    pub site_name: String,
}

impl Default for LoginSecuritySettings {
    fn default() -> Self {
        Self {
            user_wrong_count: 0,
            activity_threshold: 0,
            track_time: 1,
            user_blocked_notification_emails: String::new(),
            login_activity_notification_emails: String::new(),
            log_enabled: true,
            site_name: "Warden".to_string(),
        }
    }
}

impl LoginSecuritySettings {
    /// Settings with every policy switched off.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Config(ConfigError::Parse(e)))
    }

    /// Read settings from `WARDEN_*` environment variables.
    ///
    /// Variables that are not set keep their default value; variables that are
    /// set but malformed are reported as [`ConfigError::InvalidValue`].
    pub fn from_env() -> Result<Self, Error> {
        let mut settings = Self::default();

        if let Some(value) = env_number("WARDEN_USER_WRONG_COUNT")? {
            settings.user_wrong_count = value;
        }
        if let Some(value) = env_number("WARDEN_ACTIVITY_THRESHOLD")? {
            settings.activity_threshold = value;
        }
        if let Some(value) = env_number("WARDEN_TRACK_TIME")? {
            settings.track_time = value;
        }
        if let Ok(value) = std::env::var("WARDEN_USER_BLOCKED_EMAILS") {
            settings.user_blocked_notification_emails = value;
        }
        if let Ok(value) = std::env::var("WARDEN_ACTIVITY_EMAILS") {
            settings.login_activity_notification_emails = value;
        }
        if let Ok(value) = std::env::var("WARDEN_LOG_ENABLED") {
            settings.log_enabled = match value.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "WARDEN_LOG_ENABLED".to_string(),
                        value,
                    }
                    .into());
                }
            };
        }
        if let Ok(value) = std::env::var("WARDEN_SITE_NAME") {
            settings.site_name = value;
        }

        Ok(settings)
    }

    /// Length of the tracking window. Negative values count as zero.
    pub fn window_span(&self) -> Duration {
        Duration::hours(self.track_time.max(0))
    }

    /// Notification routing for a given event.
    ///
    /// Blocked accounts go to the blocked-user recipients, attacks to the
    /// activity recipients. Subsided attacks are only logged.
    pub fn notification_config(&self, event: &SecurityEvent) -> NotificationConfig {
        let recipients = match event {
            SecurityEvent::Blocked(_) => parse_recipients(&self.user_blocked_notification_emails),
            SecurityEvent::AttackDetected(_) => {
                parse_recipients(&self.login_activity_notification_emails)
            }
            SecurityEvent::AttackSubsided(_) => BTreeSet::new(),
        };

        NotificationConfig {
            log_enabled: self.log_enabled,
            mail_enabled: !recipients.is_empty(),
            mail_recipients: recipients,
        }
    }
}

fn env_number(key: &str) -> Result<Option<i64>, Error> {
    match std::env::var(key) {
        Ok(value) => value.trim().parse::<i64>().map(Some).map_err(|_| {
            ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }
            .into()
        }),
        Err(_) => Ok(None),
    }
}

/// Split a recipient list on commas and whitespace, dropping empty entries.
pub fn parse_recipients(list: &str) -> BTreeSet<String> {
    list.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Which sinks an event is delivered to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationConfig {
    pub log_enabled: bool,
    pub mail_enabled: bool,
    pub mail_recipients: BTreeSet<String>,
}

/// Source of [`LoginSecuritySettings`].
#[async_trait]
pub trait ConfigProvider: Send + Sync + 'static {
    /// Current settings. Errors are treated by callers as "all features disabled".
    async fn settings(&self) -> Result<LoginSecuritySettings, Error>;
}

/// In-process settings that can be replaced at runtime.
#[derive(Debug, Clone, Default)]
pub struct SharedConfigProvider {
    settings: Arc<RwLock<LoginSecuritySettings>>,
}

impl SharedConfigProvider {
    pub fn new(settings: LoginSecuritySettings) -> Self {
        Self {
            settings: Arc::new(RwLock::new(settings)),
        }
    }

    /// Replace the current settings. Takes effect on the next evaluation.
    pub async fn update(&self, settings: LoginSecuritySettings) {
        *self.settings.write().await = settings;
    }

    /// Edit the current settings in place.
    pub async fn edit<F>(&self, f: F)
    where
        F: FnOnce(&mut LoginSecuritySettings),
    {
        f(&mut *self.settings.write().await);
    }
}

#[async_trait]
impl ConfigProvider for SharedConfigProvider {
    async fn settings(&self) -> Result<LoginSecuritySettings, Error> {
        Ok(self.settings.read().await.clone())
    }
}
