//! otpgate CLI
//!
//! Operator tool for a running otpgate daemon:
//! - Deliver login codes (`submit`)
//! - Inspect and wait on account readiness (`status`, `wait`)
//! - Create and check the daemon configuration (`config`)

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use og_core::api::default_callback_url;
use otpgate::client::CallbackClient;
use otpgate::commands;

#[derive(Parser)]
#[command(name = "otpgate")]
#[command(author, version, about = "Deliver login codes and watch account readiness")]
#[command(propagate_version = true)]
struct Cli {
    /// Base URL of the daemon's callback server
    #[arg(short, long, global = true, env = "OTPGATE_URL", default_value_t = default_callback_url())]
    url: String,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "OTPGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deliver a login code to the daemon
    Submit {
        /// Login code
        code: String,
        /// Target account (may be omitted when only one is configured)
        #[arg(short, long)]
        account: Option<String>,
    },

    /// Show the login phase of every account
    Status {
        /// Print the raw readiness report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Wait until accounts are authorized
    Wait {
        /// Accounts to wait for (all when omitted)
        accounts: Vec<String>,
        /// Give up after this many seconds
        #[arg(short, long, default_value_t = 300)]
        timeout: u64,
        /// Seconds between readiness polls
        #[arg(long, default_value_t = 2)]
        interval: u64,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Write a starter configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Validate the configuration and list its accounts
    Check,
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Submit { code, account } => {
            let client = CallbackClient::with_url(&cli.url)?;
            commands::submit_command(&client, account.as_deref(), &code).await?;
        }

        Commands::Status { json } => {
            let client = CallbackClient::with_url(&cli.url)?;
            commands::status_command(&client, json).await?;
        }

        Commands::Wait {
            accounts,
            timeout,
            interval,
        } => {
            let client = CallbackClient::with_url(&cli.url)?;
            tracing::debug!(url = %client.base_url(), "Waiting on readiness");
            commands::wait_command(
                &client,
                &accounts,
                Duration::from_secs(timeout),
                Duration::from_secs(interval.max(1)),
            )
            .await?;
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                commands::config_show(cli.config.as_ref())?;
            }
            ConfigAction::Init { force } => {
                commands::config_init(cli.config.as_ref(), force)?;
            }
            ConfigAction::Check => {
                commands::config_check(cli.config.as_ref())?;
            }
            ConfigAction::Path => {
                let path = commands::resolve_config_path(cli.config.as_ref());
                println!("{}", path.display());
            }
        },
    }

    Ok(())
}
