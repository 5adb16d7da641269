// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! rutax CLI - receipt lookup from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Decode a receipt photo and fetch its details
//! rutax check --qr qr.jpg
//!
//! # Resolve a QR payload to a ticket id
//! rutax resolve "t=20200915T1518&s=1280.00&fn=9289000100408074&i=63297&fp=1471624783&n=1"
//!
//! # Fetch a ticket as JSON
//! rutax --format json --pretty ticket 5f60b5a6e7ab2d4f7c5e1c2a
//!
//! # Force a session refresh
//! rutax refresh
//! ```

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{check, decode, refresh, resolve, ticket};

// ============================================================================
// CLI Definition
// ============================================================================

/// rutax CLI - receipt lookup via the tax-authority mobile API.
#[derive(Parser)]
#[command(name = "rutax")]
#[command(about = "Receipt lookup via the tax-authority mobile API")]
#[command(version)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Credential file (TOML with session, client_secret, refresh_token).
    #[arg(long, global = true)]
    pub credentials: Option<PathBuf>,

    /// Client configuration file (TOML).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the API base URL.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Override the Device-Id header.
    #[arg(long, global = true)]
    pub device_id: Option<String>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (no logging).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Decode a receipt photo, resolve it and show the details.
    #[command(visible_alias = "c")]
    Check(check::CheckArgs),

    /// Resolve a QR payload string to a ticket id.
    #[command(visible_alias = "r")]
    Resolve(resolve::ResolveArgs),

    /// Fetch the details of a ticket id.
    #[command(visible_alias = "t")]
    Ticket(ticket::TicketArgs),

    /// Refresh the session and persist the new credentials.
    Refresh,

    /// Decode a receipt photo without calling the API.
    Decode(decode::DecodeArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// Session could not be refreshed.
    SessionExpired = 2,
    /// No QR code in the image.
    NoQrCode = 3,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("rutax=debug,rutax_fetch=debug,rutax_store=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Check(args) => check::run(args, &cli).await,
        Commands::Resolve(args) => resolve::run(args, &cli).await,
        Commands::Ticket(args) => ticket::run(args, &cli).await,
        Commands::Refresh => refresh::run(&cli).await,
        Commands::Decode(args) => decode::run(args, &cli),
    };

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(exit_code(&e) as i32);
    }

    Ok(())
}

fn exit_code(error: &anyhow::Error) -> ExitCode {
    use rutax_fetch::{FetchError, QrError};

    match error.downcast_ref::<FetchError>() {
        Some(FetchError::SessionExpired { .. } | FetchError::RefreshFailed(_)) => {
            ExitCode::SessionExpired
        }
        Some(FetchError::Qr(QrError::NotFound)) => ExitCode::NoQrCode,
        _ if matches!(error.downcast_ref::<QrError>(), Some(QrError::NotFound)) => {
            ExitCode::NoQrCode
        }
        _ => ExitCode::Error,
    }
}
