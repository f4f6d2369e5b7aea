//! Stripe Terminal sample backend entry point.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use terminal_backend::api::{create_router, AppState};
use terminal_backend::config::Config;
use terminal_backend::metrics;
use terminal_backend::stripe::{PaymentProvider, StripeClient};
use terminal_backend::utils::shutdown_signal;

/// Server-driven Stripe Terminal sample backend.
#[derive(Parser, Debug)]
#[command(name = "terminal-backend")]
#[command(about = "HTTP backend relaying point-of-sale requests to Stripe Terminal")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP server port (overrides PORT).
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve {
        /// HTTP server port (overrides PORT).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check configuration validity.
    CheckConfig,

    /// List the readers registered on the account.
    ListReaders,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("terminal_backend=debug,tower_http=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match args.command {
        Some(Command::Serve { port }) => cmd_serve(port.or(args.port)).await,
        Some(Command::CheckConfig) => cmd_check_config(),
        Some(Command::ListReaders) => cmd_list_readers().await,
        None => cmd_serve(args.port).await,
    }
}

/// Load and validate configuration, logging the failure.
fn load_config() -> anyhow::Result<Config> {
    let config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(e.into());
    }

    Ok(config)
}

/// Check configuration validity.
fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("TERMINAL BACKEND - CONFIGURATION CHECK");
    println!("======================================================================");

    let config = load_config()?;

    println!("Configuration Summary:");
    println!("  Secret Key: {}", config.masked_key());
    println!(
        "  Mode: {}",
        if config.is_test_mode() { "TEST" } else { "LIVE" }
    );
    println!("  Stripe API: {}", config.stripe_api_url);
    println!("  Static Dir: {}", config.static_dir.display());
    println!("  Listen: {}", config.bind_addr());
    println!(
        "  Metrics: {}",
        if config.metrics_enabled { "Enabled" } else { "Disabled" }
    );
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// List readers once, as a connectivity check.
async fn cmd_list_readers() -> anyhow::Result<()> {
    let config = load_config()?;
    let client = StripeClient::new(&config)?;

    let readers = client.list_readers().await?;
    println!("{} reader(s)", readers.len());
    for reader in &readers {
        println!(
            "  {}  {:<24}  {:<22}  {}",
            reader.id,
            reader.label.as_deref().unwrap_or("-"),
            reader.device_type.as_deref().unwrap_or("-"),
            reader.status.as_deref().unwrap_or("-"),
        );
    }

    Ok(())
}

/// Run the HTTP server until a shutdown signal arrives.
async fn cmd_serve(port_override: Option<u16>) -> anyhow::Result<()> {
    info!("Loading configuration...");
    let mut config = load_config()?;

    if let Some(port) = port_override {
        config.port = port;
    }

    if !config.is_test_mode() {
        warn!("Using a live-mode key; simulate-payment only works with test readers");
    }

    let client = StripeClient::new(&config)?;
    let mut state = AppState::new(&config, Arc::new(client));

    if config.metrics_enabled {
        let handle = metrics::init_metrics()?;
        state = state.with_metrics(handle);
    }

    let addr = config.bind_addr();
    let listener = TcpListener::bind(addr).await?;
    info!("server running at {}", addr);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
