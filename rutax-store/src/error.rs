//! Store error types.

use thiserror::Error;

/// Errors that can occur while storing credentials.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Credential file could not be parsed.
    #[error("Failed to parse credential file: {0}")]
    TomlDecode(#[from] toml::de::Error),

    /// Credentials could not be serialized.
    #[error("Failed to serialize credentials: {0}")]
    TomlEncode(#[from] toml::ser::Error),

    /// Loaded credentials are incomplete.
    #[error(transparent)]
    Core(#[from] rutax_core::CoreError),

    /// A previous write failed and the persister stopped accepting updates.
    #[error("Credential persister halted after a failed write: {0}")]
    PersisterHalted(String),

    /// The persister task is no longer running.
    #[error("Credential persister is not running")]
    PersisterGone,
}

impl StoreError {
    /// Returns true if the persister will not accept further writes.
    pub fn is_halted(&self) -> bool {
        matches!(self, StoreError::PersisterHalted(_) | StoreError::PersisterGone)
    }
}
