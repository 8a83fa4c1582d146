use thiserror::Error;

/// Errors returned by the [`Warden`](crate::Warden) facade.
#[derive(Debug, Error)]
pub enum WardenError {
    #[error(transparent)]
    Core(#[from] warden_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid attempt on line {line}: {reason}")]
    InvalidAttempt { line: usize, reason: String },
}

/// Errors that can occur when building a [`Warden`](crate::Warden) instance.
#[derive(Debug, Error)]
pub enum WardenBuilderError {
    /// Invalid configuration provided
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Failed to configure mailer
    #[cfg(feature = "mailer")]
    #[error("Mailer configuration failed: {0}")]
    MailerConfiguration(String),
}

impl WardenError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, WardenError::Core(e) if e.is_not_found())
    }
}
