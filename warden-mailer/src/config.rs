use crate::{FileTransport, Mailer, MailerError, SmtpTransport};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How security alert mails leave the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailerConfig {
    pub transport: TransportConfig,
    pub from_address: String,
    pub from_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportConfig {
    Smtp(SmtpSettings),
    File { output_dir: PathBuf },
}

/// SMTP relay used for alert mails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpSettings {
    pub host: String,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tls: Option<TlsType>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TlsType {
    None,
    #[default]
    StartTls,
    Tls,
}

impl TlsType {
    fn parse(value: &str) -> Result<Self, MailerError> {
        match value.to_lowercase().as_str() {
            "none" => Ok(TlsType::None),
            "starttls" => Ok(TlsType::StartTls),
            "tls" => Ok(TlsType::Tls),
            other => Err(MailerError::Config(format!(
                "MAILER_SMTP_TLS must be one of none, starttls, tls (got {other})"
            ))),
        }
    }
}

impl MailerConfig {
    /// Read the configuration from `MAILER_*` environment variables.
    ///
    /// `MAILER_SMTP_HOST` selects SMTP, otherwise mails are written to
    /// `MAILER_FILE_OUTPUT_DIR` (default `./emails`).
    pub fn from_env() -> Result<Self, MailerError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, MailerError> {
        let transport = if let Some(host) = var("MAILER_SMTP_HOST") {
            let port = var("MAILER_SMTP_PORT")
                .map(|port| {
                    port.parse::<u16>().map_err(|_| {
                        MailerError::Config(format!("MAILER_SMTP_PORT is not a port: {port}"))
                    })
                })
                .transpose()?;
            let tls = var("MAILER_SMTP_TLS")
                .map(|tls| TlsType::parse(&tls))
                .transpose()?;

            TransportConfig::Smtp(SmtpSettings {
                host,
                port,
                username: var("MAILER_SMTP_USERNAME"),
                password: var("MAILER_SMTP_PASSWORD"),
                tls,
            })
        } else {
            TransportConfig::File {
                output_dir: var("MAILER_FILE_OUTPUT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("./emails")),
            }
        };

        Ok(Self {
            transport,
            from_address: var("MAILER_FROM_ADDRESS")
                .unwrap_or_else(|| "noreply@example.com".to_string()),
            from_name: var("MAILER_FROM_NAME"),
        })
    }

    pub fn build_transport(&self) -> Result<Box<dyn Mailer>, MailerError> {
        match &self.transport {
            TransportConfig::Smtp(settings) => Ok(Box::new(SmtpTransport::from_settings(settings)?)),
            TransportConfig::File { output_dir } => Ok(Box::new(FileTransport::new(output_dir)?)),
        }
    }

    pub fn get_from_address(&self) -> String {
        match &self.from_name {
            Some(name) => format!("{} <{}>", name, self.from_address),
            None => self.from_address.clone(),
        }
    }
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::File {
                output_dir: PathBuf::from("./emails"),
            },
            from_address: "noreply@example.com".to_string(),
            from_name: None,
        }
    }
}
