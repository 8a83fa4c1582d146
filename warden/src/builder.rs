//! Builder pattern for constructing Warden instances
//!
//! The builder tracks at the type level whether an [`AccountStore`] has been
//! supplied, so [`WardenBuilder::build`] is only available once it has.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use warden::{LoginSecuritySettings, WardenBuilder};
//! use warden::memory::InMemoryAccountStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let warden = WardenBuilder::new()
//!     .with_accounts(Arc::new(InMemoryAccountStore::new()))
//!     .with_settings(LoginSecuritySettings::from_env()?)
//!     .build()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use warden_core::{
    AccountStore, AuditSink, ConfigProvider, LoginProcessor, LoginSecuritySettings, MailSink,
    NotificationDispatcher, SharedConfigProvider, error::NotificationError,
    memory::TracingAuditSink,
};

use crate::{Warden, WardenBuilderError};

#[cfg(feature = "mailer")]
use crate::{MailerConfig, MailerSink};

/// Marker type indicating no account store has been configured yet.
///
/// This is the initial state of [`WardenBuilder`].
pub struct NoAccounts;

/// Marker type indicating an account store has been configured.
pub struct WithAccounts<A: AccountStore> {
    accounts: Arc<A>,
}

enum Settings {
    Shared(SharedConfigProvider),
    Provider(Arc<dyn ConfigProvider>),
}

/// A type-safe builder for constructing [`Warden`] instances.
///
/// # Defaults
///
/// - Settings: [`LoginSecuritySettings::default`], every policy disabled
/// - Audit sink: [`TracingAuditSink`]
/// - Mail sink: none
pub struct WardenBuilder<Accounts> {
    accounts: Accounts,
    settings: Settings,
    audit: Arc<dyn AuditSink>,
    mail: Option<Arc<dyn MailSink>>,
    errors: Option<UnboundedSender<NotificationError>>,
    #[cfg(feature = "mailer")]
    mailer_config: Option<MailerConfig>,
}

impl Default for WardenBuilder<NoAccounts> {
    fn default() -> Self {
        Self::new()
    }
}

impl WardenBuilder<NoAccounts> {
    pub fn new() -> Self {
        Self {
            accounts: NoAccounts,
            settings: Settings::Shared(SharedConfigProvider::default()),
            audit: Arc::new(TracingAuditSink),
            mail: None,
            errors: None,
            #[cfg(feature = "mailer")]
            mailer_config: None,
        }
    }

    /// Use the host's account store.
    pub fn with_accounts<A: AccountStore>(self, accounts: Arc<A>) -> WardenBuilder<WithAccounts<A>> {
        WardenBuilder {
            accounts: WithAccounts { accounts },
            settings: self.settings,
            audit: self.audit,
            mail: self.mail,
            errors: self.errors,
            #[cfg(feature = "mailer")]
            mailer_config: self.mailer_config,
        }
    }
}

impl<Accounts> WardenBuilder<Accounts> {
    /// Start from fixed settings that can later be replaced through
    /// [`Warden::shared_settings`].
    pub fn with_settings(mut self, settings: LoginSecuritySettings) -> Self {
        self.settings = Settings::Shared(SharedConfigProvider::new(settings));
        self
    }

    /// Read settings from the host on every attempt.
    pub fn with_config_provider(mut self, provider: Arc<dyn ConfigProvider>) -> Self {
        self.settings = Settings::Provider(provider);
        self
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_mail_sink(mut self, mail: Arc<dyn MailSink>) -> Self {
        self.mail = Some(mail);
        self
    }

    /// Receive notification delivery failures.
    pub fn with_error_channel(mut self, errors: UnboundedSender<NotificationError>) -> Self {
        self.errors = Some(errors);
        self
    }

    /// Deliver mails through a `warden-mailer` transport.
    #[cfg(feature = "mailer")]
    pub fn with_mailer(mut self, config: MailerConfig) -> Self {
        self.mailer_config = Some(config);
        self
    }

    /// Configure the mailer from `MAILER_*` environment variables.
    ///
    /// See [`MailerConfig::from_env`] for the variables read.
    #[cfg(feature = "mailer")]
    pub fn with_mailer_from_env(mut self) -> Result<Self, WardenBuilderError> {
        let config = MailerConfig::from_env()
            .map_err(|e| WardenBuilderError::MailerConfiguration(e.to_string()))?;
        self.mailer_config = Some(config);
        Ok(self)
    }
}

impl<A: AccountStore> WardenBuilder<WithAccounts<A>> {
    /// Build the Warden instance.
    ///
    /// # Errors
    ///
    /// Fails if both a mail sink and a mailer are configured, or if the
    /// mailer transport cannot be created.
    pub async fn build(self) -> Result<Warden<A>, WardenBuilderError> {
        let (provider, shared) = match self.settings {
            Settings::Shared(shared) => {
                let provider: Arc<dyn ConfigProvider> = Arc::new(shared.clone());
                (provider, Some(shared))
            }
            Settings::Provider(provider) => (provider, None),
        };

        #[cfg(feature = "mailer")]
        let mail = match (self.mail, self.mailer_config) {
            (Some(_), Some(_)) => {
                return Err(WardenBuilderError::InvalidConfiguration(
                    "both a mail sink and a mailer are configured".to_string(),
                ));
            }
            (None, Some(config)) => {
                let sink = MailerSink::from_config(&config)
                    .map_err(|e| WardenBuilderError::MailerConfiguration(e.to_string()))?;
                Some(Arc::new(sink) as Arc<dyn MailSink>)
            }
            (mail, None) => mail,
        };
        #[cfg(not(feature = "mailer"))]
        let mail = self.mail;

        let mut dispatcher = NotificationDispatcher::new(self.audit);
        if let Some(mail) = mail {
            dispatcher = dispatcher.with_mail_sink(mail);
        }
        if let Some(errors) = self.errors {
            dispatcher = dispatcher.with_error_channel(errors);
        }

        tracing::debug!(
            mail = dispatcher.has_mail_sink(),
            "Built login security monitor"
        );

        let warden = Warden::new(LoginProcessor::new(
            self.accounts.accounts,
            provider,
            dispatcher,
        ));

        Ok(match shared {
            Some(shared) => warden.with_shared_settings(shared),
            None => warden,
        })
    }
}
