//! Credential file persistence.
//!
//! The credential file is a small TOML document:
//!
//! ```toml
//! session = "..."
//! client_secret = "..."
//! refresh_token = "..."
//! ```
//!
//! It is always rewritten as a whole and holds secrets, so writes go through a
//! temp file + rename and the file is restricted to the owner on Unix.

use rutax_core::Credentials;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

use crate::error::StoreError;

// ============================================================================
// Default Paths
// ============================================================================

/// Returns the default configuration directory.
///
/// - macOS: `~/Library/Application Support/rutax`
/// - Linux: `~/.config/rutax`
/// - Windows: `%APPDATA%\rutax`
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|c| c.join("rutax"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the default credential file path.
pub fn default_credentials_path() -> PathBuf {
    default_config_dir().join("credentials.toml")
}

/// Returns the default client configuration file path.
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

// ============================================================================
// Security: File Permissions
// ============================================================================

/// Sets restrictive file permissions (0o600) on Unix systems.
#[cfg(unix)]
async fn set_restrictive_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    debug!(path = %path.display(), mode = "0600", "Set restrictive permissions");
    Ok(())
}

/// Sets restrictive directory permissions (0o700) on Unix systems.
#[cfg(unix)]
async fn set_restrictive_dir_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700)).await?;
    debug!(path = %path.display(), mode = "0700", "Set restrictive directory permissions");
    Ok(())
}

/// No-op for non-Unix systems.
#[cfg(not(unix))]
async fn set_restrictive_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

/// No-op for non-Unix systems.
#[cfg(not(unix))]
async fn set_restrictive_dir_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

// ============================================================================
// File Operations
// ============================================================================

/// Creates the parent directory if missing, owner-only on Unix.
async fn ensure_parent_dir(path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !tokio::fs::try_exists(parent).await? {
            debug!(path = %parent.display(), "Creating credential directory");
            tokio::fs::create_dir_all(parent).await?;
            set_restrictive_dir_permissions(parent).await?;
        }
    }
    Ok(())
}

/// Loads credentials from a TOML file.
///
/// Fails if the file is missing, malformed, or any field is empty.
#[instrument(skip_all, fields(path = %path.display()))]
pub async fn load_credentials(path: &Path) -> Result<Credentials, StoreError> {
    debug!("Loading credential file");

    let content = tokio::fs::read_to_string(path).await?;
    let creds: Credentials = toml::from_str(&content)?;
    creds.validate()?;

    debug!("Credential file loaded");
    Ok(creds)
}

/// Writes credentials to a TOML file, replacing any previous content.
#[instrument(skip_all, fields(path = %path.display()))]
pub async fn save_credentials(path: &Path, creds: &Credentials) -> Result<(), StoreError> {
    debug!("Saving credential file");

    ensure_parent_dir(path).await?;

    let content = toml::to_string(creds)?;

    let temp_path = path.with_extension("toml.tmp");
    if let Err(e) = write_and_swap(&temp_path, path, content.as_bytes()).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e);
    }

    debug!("Credential file saved");
    Ok(())
}

/// Tightens the temp file before it receives secrets, then swaps it in.
async fn write_and_swap(temp_path: &Path, path: &Path, content: &[u8]) -> Result<(), StoreError> {
    tokio::fs::write(temp_path, b"").await?;
    set_restrictive_permissions(temp_path).await?;
    tokio::fs::write(temp_path, content).await?;
    tokio::fs::rename(temp_path, path).await?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
