//! Decode command - read a receipt QR code offline.

use anyhow::Result;
use clap::Args;
use rutax_core::QrPayload;
use rutax_fetch::{QrDecoder, RqrrDecoder, open_image};
use std::path::PathBuf;

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the decode command.
#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Receipt photo containing the QR code.
    #[arg(long, default_value = "qr.jpg")]
    pub qr: PathBuf,
}

/// Runs the decode command.
pub fn run(args: &DecodeArgs, cli: &Cli) -> Result<()> {
    let image = open_image(&args.qr)?;
    let payload = QrPayload::parse(&RqrrDecoder.decode(&image)?)?;

    match cli.format {
        OutputFormat::Text => {
            println!("{}", TextFormatter::new(!cli.no_color).format_payload(&payload));
        }
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format_payload(&payload)?);
        }
    }

    Ok(())
}
