//! # idv CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use idv_cli::status::{run_status, StatusArgs};
use idv_cli::verify::{run_verify, VerifyArgs};
use idv_cli::GatewayOpts;
use idv_client::HttpVerificationGateway;
use idv_session::{StaticTokenProvider, VerificationController};

/// Identity verification CLI.
///
/// Checks remote verification status and runs the selfie plus identity
/// document workflow against the verification API.
#[derive(Parser, Debug)]
#[command(name = "idv", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Bearer token for the verification API.
    #[arg(long, env = "IDV_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    #[command(flatten)]
    gateway: GatewayOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the remote verification status for the token.
    Status(StatusArgs),

    /// Verify identity with a selfie and identity document images.
    Verify(VerifyArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    let config = cli.gateway.resolve()?;
    tracing::debug!(base_url = %config.base_url, timeout_secs = config.timeout_secs, "gateway configured");
    let gateway = HttpVerificationGateway::new(config)?;
    let tokens = cli
        .token
        .map(StaticTokenProvider::new)
        .unwrap_or_default();
    let mut stdout = std::io::stdout().lock();

    match cli.command {
        Commands::Status(args) => run_status(&args, &gateway, &tokens, &mut stdout).await,
        Commands::Verify(args) => {
            let (mut controller, teardown) = VerificationController::new(gateway, tokens);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("interrupted, abandoning verification");
                    teardown.tear_down();
                }
            });
            run_verify(&args, &mut controller, &mut stdout).await
        }
    }
}
