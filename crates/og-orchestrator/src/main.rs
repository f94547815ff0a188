//! otpgate daemon
//!
//! Logs every configured account in, persisting sessions to the remote store,
//! and serves the OTP callback and readiness endpoints until shut down.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use og_core::config::{self, GatewayConfig};
use og_orchestrator::bridge::BridgeSessionClient;
use og_orchestrator::server::{CallbackServer, CallbackState};
use og_orchestrator::{store, AuthOrchestrator};

#[derive(Parser)]
#[command(name = "og-orchestrator")]
#[command(about = "otpgate login orchestrator daemon")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "OTPGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Callback bind address (overrides config)
    #[arg(short, long, env = "OTPGATE_BIND")]
    bind: Option<String>,

    /// Callback port (overrides the port of the bind address)
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn bind_address(config: &GatewayConfig, bind: Option<String>, port: Option<u16>) -> Result<String> {
    let bind = bind.unwrap_or_else(|| config.bind_address.clone());
    match port {
        Some(port) => {
            let mut addr: SocketAddr = bind
                .parse()
                .with_context(|| format!("Invalid bind address {:?}", bind))?;
            addr.set_port(port);
            Ok(addr.to_string())
        }
        None => Ok(bind),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| args.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("otpgate orchestrator starting...");

    // Load configuration
    let config_path = args.config.clone().unwrap_or_else(config::default_config_path);
    let config: GatewayConfig = config::load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    config.validate().context("Invalid configuration")?;

    let bind_addr = bind_address(&config, args.bind, args.port)?;

    let store = store::from_config(&config.store).context("Failed to set up session store")?;

    let mut orchestrator =
        AuthOrchestrator::new(Arc::clone(&store), config.login.clone(), &config.session_dir);
    for account in &config.accounts {
        let client = BridgeSessionClient::new(&config.bridge, account, &config.session_dir)
            .with_context(|| format!("Failed to set up client for {}", account.account_id))?;
        orchestrator
            .add_account(account, Box::new(client))
            .with_context(|| format!("Failed to add account {}", account.account_id))?;
    }
    tracing::info!(
        "Configured {} account(s) using the {} store",
        config.accounts.len(),
        store.name()
    );

    // Create cancellation token for graceful shutdown
    let cancel = CancellationToken::new();

    // Bind before logging in so codes can be delivered as soon as they are requested
    let server = CallbackServer::bind(
        bind_addr.as_str(),
        CallbackState {
            inbox: orchestrator.inbox(),
            board: orchestrator.board(),
        },
    )
    .await
    .with_context(|| format!("Failed to bind callback server on {}", bind_addr))?;
    let server_task = tokio::spawn(server.serve(cancel.clone()));

    // Setup signal handlers
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::warn!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C, initiating shutdown...");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, initiating shutdown...");
            }
        }

        cancel_clone.cancel();
    });

    let running = orchestrator.spawn(cancel.clone());
    let summary = running.join().await;

    for account in &summary.authorized {
        tracing::info!(account = %account, "Account ready");
    }
    for status in &summary.failed {
        match &status.last_error {
            Some(error) => tracing::error!(
                account = %status.account_id,
                kind = error.kind(),
                "Account failed to log in: {}",
                error
            ),
            None => tracing::error!(account = %status.account_id, "Account failed to log in"),
        }
    }
    if !summary.all_authorized() && !cancel.is_cancelled() {
        tracing::warn!("Not every account is authorized; restart the process to retry");
    }

    // Keep answering readiness queries until shut down
    server_task
        .await
        .context("Callback server task failed")?
        .context("Callback server error")?;

    tracing::info!("Orchestrator shutdown complete");
    Ok(())
}
