//! Delivery of security notifications through a `warden-mailer` transport.

use async_trait::async_trait;
use warden_core::{MailSink, error::NotificationError};
use warden_mailer::{Email, Mailer, MailerConfig, MailerError};

/// [`MailSink`] that renders each notification as an alert mail and hands it
/// to a [`Mailer`].
pub struct MailerSink {
    transport: Box<dyn Mailer>,
    from: String,
}

impl MailerSink {
    pub fn new(transport: Box<dyn Mailer>, from: impl Into<String>) -> Self {
        Self {
            transport,
            from: from.into(),
        }
    }

    /// Build the transport described by `config`.
    pub fn from_config(config: &MailerConfig) -> Result<Self, MailerError> {
        Ok(Self::new(config.build_transport()?, config.get_from_address()))
    }
}

#[async_trait]
impl MailSink for MailerSink {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        site_name: &str,
    ) -> Result<(), NotificationError> {
        let delivery_error = |e: MailerError| NotificationError::MailDelivery {
            recipient: to.to_string(),
            reason: e.to_string(),
        };

        let email = Email::security_alert(&self.from, to, site_name, subject, body)
            .map_err(delivery_error)?;
        self.transport
            .send_email(email)
            .await
            .map_err(delivery_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_mailer::config::TransportConfig;

    fn file_config(dir: &std::path::Path) -> MailerConfig {
        MailerConfig {
            transport: TransportConfig::File {
                output_dir: dir.to_path_buf(),
            },
            from_address: "security@example.com".to_string(),
            from_name: Some("Warden".to_string()),
        }
    }

    #[tokio::test]
    async fn test_mail_written_by_file_transport() {
        let dir = tempfile::tempdir().unwrap();
        let sink = MailerSink::from_config(&file_config(dir.path())).unwrap();

        sink.send(
            "test@test.com",
            "Security action: The user bob has been blocked.",
            "The user bob has been blocked at Example.",
            "Example",
        )
        .await
        .unwrap();

        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);

        let raw = std::fs::read_to_string(&files[0]).unwrap();
        assert!(raw.contains("To: test@test.com"));
        assert!(raw.contains("Security action: The user bob has been blocked."));
        assert!(raw.contains("<h2>Example</h2>"));
    }

    #[tokio::test]
    async fn test_invalid_recipient_is_a_delivery_error() {
        let dir = tempfile::tempdir().unwrap();
        let sink = MailerSink::from_config(&file_config(dir.path())).unwrap();

        let result = sink.send("not an address", "subject", "body", "Site").await;
        match result {
            Err(NotificationError::MailDelivery { recipient, .. }) => {
                assert_eq!(recipient, "not an address")
            }
            other => panic!("expected delivery error, got {other:?}"),
        }
    }
}
