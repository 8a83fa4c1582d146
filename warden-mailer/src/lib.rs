pub mod config;
pub mod email;
pub mod error;
pub mod mailer;
pub mod templates;
pub mod transports;

pub use config::MailerConfig;
pub use email::Email;
pub use error::MailerError;
pub use mailer::Mailer;
pub use templates::SecurityAlertTemplate;
pub use transports::{FileTransport, SmtpTransport};

pub mod prelude {
    pub use crate::{
        Email, FileTransport, Mailer, MailerConfig, MailerError, SecurityAlertTemplate,
        SmtpTransport,
    };
}
