//! CLI command implementations.

pub mod check;
pub mod decode;
pub mod refresh;
pub mod resolve;
pub mod ticket;

use anyhow::{Context, Result};
use rutax_fetch::{ApiConfig, TaxClient};
use rutax_store::{default_config_path, default_credentials_path};
use tracing::debug;

use crate::Cli;

/// Resolves the client configuration: config file first, then CLI overrides.
pub fn load_config(cli: &Cli) -> Result<ApiConfig> {
    let path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = ApiConfig::load_from(&path)?;

    if let Some(url) = &cli.base_url {
        config.base_url.clone_from(url);
    }
    if let Some(id) = &cli.device_id {
        config.device_id.clone_from(id);
    }

    Ok(config.validate()?)
}

/// Builds a client backed by the credential file.
pub async fn build_client(cli: &Cli) -> Result<TaxClient> {
    let config = load_config(cli)?;
    let path = cli
        .credentials
        .clone()
        .unwrap_or_else(default_credentials_path);

    debug!(path = %path.display(), base_url = %config.base_url, "Building client");

    TaxClient::from_file(&path, config)
        .await
        .with_context(|| format!("failed to load credentials from {}", path.display()))
}
