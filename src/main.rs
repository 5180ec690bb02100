//! Demo web application host (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!   appsettings.json ─┐
//!   appsettings.<env>.json ─┼─▶ Configuration ──▶ Startup::configure_services (Phase 1)
//!   environment / CLI ─┘                              │
//!                                                     ▼
//!                                              ServiceProvider
//!                                                     │
//!                                                     ▼
//!                                    Startup::configure (Phase 2)
//!                                    ┌──────────────────────────────────────┐
//!   Client Request ─────────────────▶│ request-id → trace → exception stage │
//!                                    │ → static files (wwwroot)             │
//!                                    │ → mvc: route → handler → action      │
//!   Client Response ◀────────────────└──────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use demo_host::{Host, HostOptions, Shutdown};

#[derive(Debug, Parser)]
#[command(name = "demo-host", version, about = "Demo web application host")]
struct Cli {
    /// Directory holding appsettings files, logging.toml and wwwroot.
    #[arg(long, default_value = ".")]
    content_root: PathBuf,

    /// Hosting environment (Development, Staging, Production, ...).
    #[arg(long, env = "APP_ENVIRONMENT", default_value = "Production")]
    environment: String,

    /// Listen address; overrides Host:BindAddress.
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Host terminated");
            eprintln!("demo-host: {e}");
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut options = HostOptions::new(cli.content_root).with_environment(cli.environment);
    if let Some(bind) = cli.bind {
        options = options.with_override("Host:BindAddress", bind.to_string());
    }

    let host = Host::build(options)?;
    tracing::info!("demo-host v{} starting", env!("CARGO_PKG_VERSION"));

    let listener = host.bind().await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    tokio::spawn(shutdown.clone().trigger_on_ctrl_c());

    host.run(listener, receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
