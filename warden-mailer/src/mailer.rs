use crate::{Email, MailerError};
use async_trait::async_trait;

/// A mail transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_email(&self, email: Email) -> Result<(), MailerError>;
}
