//! Fan-out of security events to the audit log and to mail recipients.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::{
    error::NotificationError,
    events::SecurityEvent,
    ports::{AuditSink, MailSink},
    settings::NotificationConfig,
};

/// Delivers [`SecurityEvent`]s to the configured sinks.
///
/// Delivery never fails from the caller's point of view. Sink errors are
/// logged and, if an error channel is attached, forwarded to it.
#[derive(Clone)]
pub struct NotificationDispatcher {
    audit: Arc<dyn AuditSink>,
    mail: Option<Arc<dyn MailSink>>,
    errors: Option<UnboundedSender<NotificationError>>,
}

impl NotificationDispatcher {
    pub fn new(audit: Arc<dyn AuditSink>) -> Self {
        Self {
            audit,
            mail: None,
            errors: None,
        }
    }

    pub fn with_mail_sink(mut self, mail: Arc<dyn MailSink>) -> Self {
        self.mail = Some(mail);
        self
    }

    /// Forward sink failures to `errors` in addition to logging them.
    pub fn with_error_channel(mut self, errors: UnboundedSender<NotificationError>) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn has_mail_sink(&self) -> bool {
        self.mail.is_some()
    }

    /// Deliver one event: one audit entry if logging is enabled, one mail per
    /// recipient if mail is enabled. Mails name `site_name`.
    pub async fn dispatch(
        &self,
        event: &SecurityEvent,
        config: &NotificationConfig,
        site_name: &str,
    ) {
        if config.log_enabled {
            if let Err(e) = self
                .audit
                .write(event.severity(), event.log_template(), &event.params())
                .await
            {
                self.report(e);
            }
        }

        if !config.mail_enabled {
            return;
        }

        let Some(mail) = &self.mail else {
            tracing::debug!("Mail notification enabled but no mail sink configured");
            return;
        };

        let Some((subject, body)) = event.mail_content(site_name) else {
            return;
        };

        for recipient in &config.mail_recipients {
            match mail.send(recipient, &subject, &body, site_name).await {
                Ok(()) => tracing::debug!(recipient = %recipient, "Security notification mailed"),
                Err(e) => self.report(e),
            }
        }
    }

    fn report(&self, error: NotificationError) {
        tracing::error!(error = %error, "Failed to deliver security notification");
        if let Some(errors) = &self.errors {
            // the receiver may be gone; the failure is already logged
            let _ = errors.send(error);
        }
    }
}
