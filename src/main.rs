//! Edge gateway server.
//!
//! ```text
//!                          ┌──────────────────────────────────────────────┐
//!                          │                 EDGE GATEWAY                 │
//!     Client Request       │  ┌─────────┐   ┌──────────┐   ┌───────────┐  │
//!     ─────────────────────┼─▶│  http   │──▶│ routing  │──▶│ security  │  │
//!                          │  │ server  │   │  table   │   │auth filter│  │
//!                          │  └─────────┘   └──────────┘   └─────┬─────┘  │
//!                          │                      reject ◀───────┤        │
//!                          │                                     ▼        │
//!     Client Response      │  ┌─────────┐                 ┌───────────┐   │
//!     ◀────────────────────┼──│response │◀────────────────│ forwarder │◀──┼──── Backend
//!                          │  └─────────┘                 └───────────┘   │
//!                          └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use edge_gateway::config::load_config;
use edge_gateway::observability::{logging, metrics};
use edge_gateway::{GatewayState, HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "edge-gateway")]
#[command(about = "JWT-authenticating edge gateway", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "GATEWAY_CONFIG", default_value = "config/gateway.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Real environment wins over .env
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let config = match load_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("edge-gateway: cannot load {}: {e}", args.config.display());
            return Ok(ExitCode::FAILURE);
        }
    };

    logging::init_logging(&config.observability);
    tracing::info!("edge-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let state = match GatewayState::build(&config) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return Ok(ExitCode::FAILURE);
        }
    };

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.listen_for_signals();

    HttpServer::new(state).run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(ExitCode::SUCCESS)
}
