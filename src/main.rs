//! Agent router - Main Entry Point
//!
//! Serves the router over HTTP, routes a one-off request from the command
//! line, or validates the configuration.

use agent_router::config::RouterConfig;
use agent_router::observability::init_default_logging;
use agent_router::orchestrator::Orchestrator;
use agent_router::server::RouterServer;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

/// Capability-based request router for JSON-RPC agents
#[derive(Parser)]
#[command(name = "agent-router")]
#[command(about = "Routes requests to the best-suited agent, or across several agents")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register the configured agents and serve the router
    Serve,
    /// Route a single request and print the structured response
    Route {
        /// Request text
        request: String,
        /// Force multi-agent planning instead of automatic dispatch
        #[arg(long)]
        multi: bool,
    },
    /// Validate configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize observability system
    init_default_logging();

    info!("Starting agent router v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = match RouterConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    // Execute command
    let result = match cli.command {
        Commands::Serve => serve(config).await,
        Commands::Route { request, multi } => route_once(config, &request, multi).await,
        Commands::Config { show } => handle_config_command(config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }

    info!("Application shutdown complete");
}

async fn build_orchestrator(
    config: RouterConfig,
) -> Result<Arc<Orchestrator>, Box<dyn std::error::Error>> {
    let orchestrator = Orchestrator::from_config(config)?;

    let registered = orchestrator.initialize_default_agents().await;
    if registered.is_empty() {
        warn!("No default agents could be registered; use the management API to add agents");
    }

    Ok(Arc::new(orchestrator))
}

async fn serve(config: RouterConfig) -> Result<(), Box<dyn std::error::Error>> {
    let orchestrator = build_orchestrator(config).await?;
    let server = RouterServer::new(orchestrator);

    // Set up signal handling for graceful shutdown
    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    let shutdown = async move {
        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down gracefully...");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down gracefully...");
            }
        }
    };

    server.run(shutdown).await?;
    Ok(())
}

async fn route_once(
    config: RouterConfig,
    request: &str,
    multi: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let orchestrator = build_orchestrator(config).await?;

    let output = if multi {
        serde_json::to_string_pretty(&orchestrator.process_multi_agent_request(request).await)?
    } else {
        serde_json::to_string_pretty(&orchestrator.process(request).await)?
    };
    println!("{output}");

    Ok(())
}

fn handle_config_command(
    config: RouterConfig,
    show: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if show {
        println!("Current configuration:");
        println!("{}", toml::to_string_pretty(&config)?);
    }

    info!("Configuration validation complete");
    Ok(())
}
