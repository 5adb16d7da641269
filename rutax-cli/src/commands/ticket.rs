//! Ticket command - ticket id to receipt details.

use anyhow::Result;
use clap::Args;
use rutax_core::TicketId;

use crate::commands::build_client;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the ticket command.
#[derive(Args, Debug)]
pub struct TicketArgs {
    /// Ticket id returned by `rutax resolve`.
    pub id: String,
}

/// Runs the ticket command.
pub async fn run(args: &TicketArgs, cli: &Cli) -> Result<()> {
    let client = build_client(cli).await?;

    let details = client
        .fetch_ticket_details(&TicketId::new(args.id.clone()))
        .await?;

    match cli.format {
        OutputFormat::Text => {
            println!("{}", TextFormatter::new(!cli.no_color).format_details(&details));
        }
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format_details(&details)?);
        }
    }

    Ok(())
}
