//! Refresh command - force a session refresh.

use anyhow::Result;
use tracing::info;

use crate::commands::build_client;
use crate::{Cli, OutputFormat};

/// Runs the refresh command.
pub async fn run(cli: &Cli) -> Result<()> {
    let client = build_client(cli).await?;

    info!("Refreshing session");
    client.refresh().await?;

    match cli.format {
        OutputFormat::Text => println!("Session refreshed"),
        OutputFormat::Json => println!(r#"{{"refreshed":true}}"#),
    }

    Ok(())
}
