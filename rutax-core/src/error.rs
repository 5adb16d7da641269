//! Core error types for rutax.

use thiserror::Error;

/// Core error type for model validation.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Credentials are missing a required field.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// QR payload could not be used.
    #[error("Invalid QR payload: {0}")]
    InvalidQrPayload(String),
}
