//! Subscription store service entry point.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sub_store::api::{self, AppState};
use sub_store::config::Config;
use sub_store::metrics;
use sub_store::store::{JsonFileStore, MemoryStore};
use sub_store::subscription::{HttpFlowFetcher, SubscriptionService};

/// Subscription store REST service.
#[derive(Parser, Debug)]
#[command(name = "sub-store")]
#[command(about = "Manage proxy subscriptions and look up their usage quota")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    /// JSON store file (overrides DATA_PATH).
    #[arg(long, global = true)]
    data_path: Option<PathBuf>,

    /// HTTP server port (overrides PORT).
    #[arg(short, long, global = true)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Run {
        /// Keep everything in memory; nothing is written to disk.
        #[arg(long)]
        ephemeral: bool,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Print every stored subscription.
    List,

    /// Fetch the usage quota of one subscription.
    Flow {
        /// Subscription name.
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration (.env first, then the environment)
    let mut config = Config::load()?;
    if let Some(path) = args.data_path {
        config.data_path = path;
    }

    // Initialize logging
    let filter = if args.verbose || config.verbose {
        EnvFilter::new("sub_store=debug,tower_http=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.rust_log))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if args.log_json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(&config),
        Some(Command::List) => cmd_list(&config),
        Some(Command::Flow { name }) => cmd_flow(&config, &name).await,
        Some(Command::Run { ephemeral }) => cmd_run(config, args.port, ephemeral).await,
        None => cmd_run(config, args.port, false).await,
    }
}

fn build_service(config: &Config, ephemeral: bool) -> anyhow::Result<Arc<SubscriptionService>> {
    if !ephemeral {
        return Ok(Arc::new(SubscriptionService::from_config(config)?));
    }

    warn!("Running with an in-memory store; changes will not be persisted");
    let flow = Arc::new(HttpFlowFetcher::new(config)?);
    Ok(Arc::new(SubscriptionService::new(Arc::new(MemoryStore::new()), flow)?))
}

/// Check configuration validity.
fn cmd_check_config(config: &Config) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("SUB-STORE - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    print!("Opening store... ");
    let store = match JsonFileStore::open(&config.data_path) {
        Ok(store) => {
            println!("OK");
            store
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Store could not be opened"));
        }
    };

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Data Path: {}", store.path().display());
    println!("  Listen: {}", config.bind_address());
    println!("  Flow Timeout: {}ms", config.flow_timeout_ms);
    println!("  Flow User-Agent: {}", config.flow_user_agent);
    println!("  Metrics: {}", if config.metrics_enabled { "Enabled" } else { "Disabled" });
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Print every stored subscription.
fn cmd_list(config: &Config) -> anyhow::Result<()> {
    let service = build_service(config, false)?;
    let subs = service.list()?;

    if subs.is_empty() {
        println!("No subscriptions stored in {}", config.data_path.display());
        return Ok(());
    }

    for sub in subs {
        println!(
            "{:<24} {:<7} {}",
            sub.name,
            sub.source().to_string(),
            sub.url.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}

/// Fetch the usage quota of one subscription.
async fn cmd_flow(config: &Config, name: &str) -> anyhow::Result<()> {
    let service = build_service(config, false)?;
    let info = service.flow_info(name).await?;

    println!("Subscription: {}", name);
    println!("  Upload:    {}", info.usage.upload);
    println!("  Download:  {}", info.usage.download);
    println!("  Total:     {}", info.total);
    println!("  Remaining: {}", info.remaining());
    match info.expires {
        Some(ts) => println!("  Expires:   {} (unix)", ts),
        None => println!("  Expires:   never"),
    }

    Ok(())
}

/// Run the HTTP server.
async fn cmd_run(mut config: Config, port: Option<u16>, ephemeral: bool) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.port = port;
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    info!("Configuration loaded successfully");
    info!("Data path: {}", config.data_path.display());
    info!("Flow timeout: {}ms", config.flow_timeout_ms);

    let service = build_service(&config, ephemeral)?;
    let mut app_state = AppState::new(service);

    if config.metrics_enabled {
        match metrics::install_prometheus() {
            Ok(handle) => app_state = app_state.with_metrics(handle),
            Err(e) => warn!("Failed to install metrics recorder: {}", e),
        }
    }

    api::serve(&config.bind_address(), app_state).await?;

    info!("Shutdown complete");
    Ok(())
}
