//! Resolve command - QR payload to ticket id.

use anyhow::Result;
use clap::Args;
use rutax_core::QrPayload;

use crate::commands::build_client;
use crate::output::JsonFormatter;
use crate::{Cli, OutputFormat};

/// Arguments for the resolve command.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// QR payload, e.g. "t=20200915T1518&s=1280.00&fn=...&i=...&fp=...&n=1".
    pub payload: String,
}

/// Runs the resolve command.
pub async fn run(args: &ResolveArgs, cli: &Cli) -> Result<()> {
    let payload = QrPayload::parse(&args.payload)?;
    let client = build_client(cli).await?;

    let id = client.resolve_ticket_id(payload.as_str()).await?;

    match cli.format {
        OutputFormat::Text => println!("{id}"),
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format_ticket_id(&id)?);
        }
    }

    Ok(())
}
