use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Account error: {0}")]
    Account(#[from] AccountError),

    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration not available: {0}")]
    Missing(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Account not found: {0}")]
    NotFound(String),

    #[error("Account store unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to block account {account}: {reason}")]
    BlockFailed { account: String, reason: String },
}

/// Errors raised by audit and mail sinks.
///
/// These never reach the login path; the dispatcher logs them and forwards
/// them to the optional error channel.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Audit log write failed: {0}")]
    AuditWrite(String),

    #[error("Mail delivery to {recipient} failed: {reason}")]
    MailDelivery { recipient: String, reason: String },
}

impl Error {
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Account(AccountError::NotFound(_)))
    }

    pub fn is_notification_error(&self) -> bool {
        matches!(self, Error::Notification(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let config_error = Error::Config(ConfigError::Missing("login_security.settings".into()));
        assert_eq!(
            config_error.to_string(),
            "Configuration error: Configuration not available: login_security.settings"
        );

        let account_error = Error::Account(AccountError::NotFound("alice".to_string()));
        assert_eq!(
            account_error.to_string(),
            "Account error: Account not found: alice"
        );
    }

    #[test]
    fn test_invalid_value_display() {
        let error = ConfigError::InvalidValue {
            key: "WARDEN_TRACK_TIME".to_string(),
            value: "soon".to_string(),
        };
        assert_eq!(error.to_string(), "Invalid value for WARDEN_TRACK_TIME: soon");
    }

    #[test]
    fn test_notification_error_variants() {
        let mail = NotificationError::MailDelivery {
            recipient: "test@test.com".to_string(),
            reason: "connection refused".to_string(),
        };
        assert_eq!(
            mail.to_string(),
            "Mail delivery to test@test.com failed: connection refused"
        );

        let audit = NotificationError::AuditWrite("disk full".to_string());
        assert_eq!(audit.to_string(), "Audit log write failed: disk full");
    }

    #[test]
    fn test_error_predicates() {
        assert!(Error::Account(AccountError::NotFound("bob".into())).is_not_found());
        assert!(
            !Error::Account(AccountError::Unavailable("down".into())).is_not_found()
        );
        assert!(Error::Config(ConfigError::Missing("x".into())).is_config_error());
        assert!(
            Error::Notification(NotificationError::AuditWrite("x".into()))
                .is_notification_error()
        );
    }

    #[test]
    fn test_error_from_conversions() {
        let error: Error = AccountError::NotFound("carol".to_string()).into();
        assert!(matches!(error, Error::Account(AccountError::NotFound(_))));

        let error: Error = NotificationError::AuditWrite("x".to_string()).into();
        assert!(error.is_notification_error());
    }
}
