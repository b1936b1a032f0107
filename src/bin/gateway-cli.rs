use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::json;

use edge_gateway::config::load_config;
use edge_gateway::http::{unsupported_routes, ErrorCode, HttpForwarder};
use edge_gateway::routing::is_ambiguous_path;
use edge_gateway::security::{TokenVerifier, VerificationKey};
use edge_gateway::{GatewayConfig, GatewayState};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Operator CLI for the edge gateway", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate a configuration, including its key
    Check { config: PathBuf },
    /// Show which route and auth policy a path resolves to
    Resolve { config: PathBuf, path: String },
    /// Verify a token against the configured key
    Verify { config: PathBuf, token: String },
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check { config } => check(&config),
        Commands::Resolve { config, path } => resolve(&config, &path),
        Commands::Verify { config, token } => verify(&config, &token),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load(path: &Path) -> Result<GatewayConfig, Box<dyn std::error::Error>> {
    Ok(load_config(path)?)
}

fn check(path: &Path) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = load(path)?;
    let state = GatewayState::build(&config)?;

    println!("configuration OK: {} route pattern(s)", state.routes().len());
    for route in state.routes().routes() {
        println!(
            "  {:<40} -> {} ({})",
            route.pattern.to_string(),
            route.target,
            if route.requires_auth { "auth" } else { "open" }
        );
    }

    let forwarder = HttpForwarder::new(Duration::from_secs(config.timeouts.connect_secs));
    for route in unsupported_routes(state.routes(), &forwarder) {
        println!(
            "warning: route `{}` targets {}, which the plain HTTP forwarder cannot reach",
            route.name, route.target
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn resolve(path: &Path, request_path: &str) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = load(path)?;
    let state = GatewayState::build(&config)?;

    if is_ambiguous_path(request_path) {
        let code = ErrorCode::InvalidRequestPath;
        println!("{}", json!({ "path": request_path, "rejected": code.as_str() }));
        return Ok(ExitCode::FAILURE);
    }

    let Some(decision) = state.routes().resolve(request_path) else {
        println!("{}", json!({ "path": request_path, "route": null }));
        return Ok(ExitCode::FAILURE);
    };

    let public = state.filter().public_paths().is_public(request_path);
    let output = json!({
        "path": request_path,
        "route": decision.route,
        "target": decision.target.as_str(),
        "upstream_path": decision.path,
        "requires_auth": decision.requires_auth && !public,
        "public": public,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(ExitCode::SUCCESS)
}

fn verify(path: &Path, token: &str) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = load(path)?;
    let key = VerificationKey::from_config(&config.auth.key)?;
    let verifier = TokenVerifier::new(key, config.auth.leeway_secs);

    match verifier.verify(token.trim()) {
        Ok(claims) => {
            println!("{}", serde_json::to_string_pretty(claims.as_map())?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            println!("{}", json!({ "valid": false, "reason": e.as_str(), "detail": e.to_string() }));
            Ok(ExitCode::FAILURE)
        }
    }
}
