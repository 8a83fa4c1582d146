use crate::{MailerError, templates::SecurityAlertTemplate};
use serde::{Deserialize, Serialize};

/// A security alert mail for a single recipient.
///
/// The alert text is sent verbatim as the plain-text part, with an HTML
/// rendering of the same text alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

impl Email {
    /// Build the alert mail for `to`, rendering the HTML part for `site_name`.
    pub fn security_alert(
        from: &str,
        to: &str,
        site_name: &str,
        subject: &str,
        body: &str,
    ) -> Result<Self, MailerError> {
        let email = Self {
            from: from.to_string(),
            to: to.trim().to_string(),
            subject: subject.to_string(),
            text_body: body.to_string(),
            html_body: SecurityAlertTemplate::new(site_name, subject, body).render_html()?,
        };

        email.validate()?;
        Ok(email)
    }

    /// Reject mails with no sender, recipient or subject. Address syntax is
    /// left to the transport.
    pub fn validate(&self) -> Result<(), MailerError> {
        if self.from.trim().is_empty() {
            return Err(MailerError::Builder("From address is required".to_string()));
        }

        if self.to.is_empty() {
            return Err(MailerError::Builder("Recipient is required".to_string()));
        }

        if self.subject.is_empty() {
            return Err(MailerError::Builder("Subject is required".to_string()));
        }

        Ok(())
    }
}
