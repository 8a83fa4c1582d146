mod file;
pub mod smtp;

pub use file::FileTransport;
pub use smtp::SmtpTransport;

use crate::{Email, MailerError};
use lettre::Message;
use lettre::message::{MultiPart, SinglePart};

/// Convert an alert [`Email`] into a multipart/alternative lettre message.
pub(crate) fn build_message(email: Email) -> Result<Message, MailerError> {
    let message = Message::builder()
        .from(email.from.parse()?)
        .to(email.to.parse()?)
        .subject(email.subject)
        .multipart(
            MultiPart::alternative()
                .singlepart(SinglePart::plain(email.text_body))
                .singlepart(SinglePart::html(email.html_body)),
        )?;

    Ok(message)
}
