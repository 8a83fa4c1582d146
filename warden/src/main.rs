use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use warden::replay::{accounts_for, read_attempts, read_settings, replay};
use warden::{LoginSecuritySettings, MailerConfig, TransportConfig, WardenBuilder};

/// Command line interface for Warden
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(clap::Subcommand)]
enum Commands {
    /// Replay recorded login attempts and print the security events raised
    Replay {
        /// Settings as JSON; WARDEN_* environment variables are used if omitted
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Write notification mails as .eml files into this directory
        #[arg(long)]
        mail_dir: Option<PathBuf>,

        /// Attempts as JSON lines
        attempts: PathBuf,
    },
    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            settings,
            mail_dir,
            attempts,
        } => {
            let settings = match settings {
                Some(path) => read_settings(path)?,
                None => LoginSecuritySettings::from_env()?,
            };
            let attempts = read_attempts(attempts)?;

            let builder = WardenBuilder::new()
                .with_accounts(Arc::new(accounts_for(&attempts)))
                .with_settings(settings);
            let builder = match mail_dir {
                Some(output_dir) => builder.with_mailer(MailerConfig {
                    transport: TransportConfig::File { output_dir },
                    ..Default::default()
                }),
                None => builder,
            };
            let warden = builder.build().await?;

            for event in replay(&warden, &attempts).await {
                println!("{}", serde_json::to_string(&event)?);
            }
        }
        Commands::Version => {
            println!("Warden v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
