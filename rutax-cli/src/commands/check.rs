//! Check command - photo to receipt details.

use anyhow::Result;
use clap::Args;
use rutax_fetch::RqrrDecoder;
use std::path::PathBuf;
use tracing::info;

use crate::commands::build_client;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the check command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Receipt photo containing the QR code.
    #[arg(long, default_value = "qr.jpg")]
    pub qr: PathBuf,
}

/// Runs the check command.
pub async fn run(args: &CheckArgs, cli: &Cli) -> Result<()> {
    let client = build_client(cli).await?;

    info!(path = %args.qr.display(), "Resolving receipt from image");
    let details = client.resolve_from_file(&RqrrDecoder, &args.qr).await?;

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_details(&details));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format_details(&details)?);
        }
    }

    Ok(())
}
