//! Standalone proxy server exposing the forwarding endpoints.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stylizer::proxy::{router, ProxyState};

/// Forwarding endpoints for the hosted stylizer frontend.
#[derive(Parser, Debug)]
#[command(name = "stylizer-proxy")]
#[command(version, about, long_about = None)]
struct Args {
    /// Address to listen on.
    #[arg(short, long, default_value = "127.0.0.1:3000", value_name = "ADDR")]
    listen: String,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("stylizer={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(err) = run(&args).await {
        tracing::error!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn run(args: &Args) -> Result<()> {
    let app = router(ProxyState::from_env());

    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    tracing::info!("Proxy listening on {}", args.listen);
    axum::serve(listener, app).await?;

    Ok(())
}
