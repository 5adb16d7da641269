//! Fetch error types.

use rutax_core::CoreError;
use rutax_store::StoreError;
use thiserror::Error;

// ============================================================================
// Main Fetch Error
// ============================================================================

/// Error type for API operations.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure (connect, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a status outside the success range.
    #[error("HTTP status {code}: {reason}")]
    Status {
        /// Numeric status code.
        code: u16,
        /// Status text.
        reason: String,
    },

    /// The session was still expired after the allowed refreshes.
    #[error("Session expired after {attempts} attempts")]
    SessionExpired {
        /// Number of requests sent, including retries.
        attempts: u32,
    },

    /// The refresh call itself did not produce a new session.
    #[error("Session refresh failed: {0}")]
    RefreshFailed(String),

    /// Response body is valid JSON but not what the endpoint promises.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A header value could not be built.
    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    /// Client configuration is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Credential storage error.
    #[error("Credential store error: {0}")]
    Store(#[from] StoreError),

    /// Model validation error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// QR decoding error.
    #[error("QR error: {0}")]
    Qr(#[from] QrError),
}

impl FetchError {
    /// Returns true if the request failed because the session stayed expired.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, FetchError::SessionExpired { .. })
    }

    /// Returns the HTTP status code carried by this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            FetchError::Status { code, .. } => Some(*code),
            FetchError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

// ============================================================================
// QR Error
// ============================================================================

/// Error type for QR decoding.
#[derive(Debug, Error)]
pub enum QrError {
    /// No QR code was found in the image.
    #[error("No QR code found in image")]
    NotFound,

    /// A code was found but could not be decoded.
    #[error("Failed to decode QR code: {0}")]
    Decode(String),

    /// The image could not be read.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}
