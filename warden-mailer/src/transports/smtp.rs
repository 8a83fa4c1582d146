use crate::config::{SmtpSettings, TlsType};
use crate::transports::build_message;
use crate::{Email, Mailer, MailerError};
use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};

/// Delivers alert mails through an SMTP relay.
#[derive(Debug, Clone)]
pub struct SmtpTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpTransport {
    /// Connect lazily to the relay described by `settings`.
    ///
    /// TLS defaults to STARTTLS. Credentials need both a username and a
    /// password.
    pub fn from_settings(settings: &SmtpSettings) -> Result<Self, MailerError> {
        let host = settings.host.as_str();
        let mut relay = match settings.tls.unwrap_or_default() {
            TlsType::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
            TlsType::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?,
            TlsType::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(host)?,
        };

        if let Some(port) = settings.port {
            relay = relay.port(port);
        }

        match (&settings.username, &settings.password) {
            (Some(username), Some(password)) => {
                relay = relay.credentials(Credentials::new(username.clone(), password.clone()));
            }
            (None, None) => {}
            _ => {
                return Err(MailerError::Config(
                    "SMTP username and password must be set together".to_string(),
                ));
            }
        }

        tracing::debug!(host = %host, port = ?settings.port, "Configured SMTP relay");
        Ok(Self {
            transport: relay.build(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpTransport {
    async fn send_email(&self, email: Email) -> Result<(), MailerError> {
        let to = email.to.clone();
        let message = build_message(email)?;
        self.transport.send(message).await?;
        tracing::debug!(to = %to, "Alert mail handed to SMTP relay");
        Ok(())
    }
}
