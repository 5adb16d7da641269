//! Client configuration.
//!
//! Everything that identifies this client to the API lives in [`ApiConfig`]
//! and is passed to [`TaxClient`](crate::TaxClient) at construction.
//!
//! An optional TOML file may override the defaults:
//!
//! ```toml
//! base_url = "https://irkkt-mobile.nalog.ru:8888/v2/"
//! device_os = "Android"
//! device_id = "1234"
//! max_session_retries = 1
//! timeout_secs = 30
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::error::FetchError;

// ============================================================================
// Constants
// ============================================================================

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://irkkt-mobile.nalog.ru:8888/v2/";

/// Default `Device-OS` header value.
pub const DEFAULT_DEVICE_OS: &str = "Android";

/// Default `Device-Id` header value.
pub const DEFAULT_DEVICE_ID: &str = "1234";

/// Default number of refresh-and-retry cycles per request.
pub const DEFAULT_MAX_SESSION_RETRIES: u32 = 1;

/// Status code the API uses for an expired session.
pub const SESSION_EXPIRED_STATUS: u16 = 498;

// ============================================================================
// Api Config
// ============================================================================

/// Settings for [`TaxClient`](crate::TaxClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every request path is appended to. Always ends with `/`
    /// after [`ApiConfig::validate`].
    pub base_url: String,
    /// `Device-OS` header value.
    pub device_os: String,
    /// `Device-Id` header value.
    pub device_id: String,
    /// How many times a request may refresh the session and retry.
    pub max_session_retries: u32,
    /// Request timeout. `None` leaves timing to the HTTP client.
    pub timeout_secs: Option<u64>,
    /// Optional `User-Agent` override.
    pub user_agent: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            device_os: DEFAULT_DEVICE_OS.to_string(),
            device_id: DEFAULT_DEVICE_ID.to_string(),
            max_session_retries: DEFAULT_MAX_SESSION_RETRIES,
            timeout_secs: None,
            user_agent: None,
        }
    }
}

impl ApiConfig {
    /// Creates a builder starting from the defaults.
    pub fn builder() -> ApiConfigBuilder {
        ApiConfigBuilder::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, FetchError> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            FetchError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: ApiConfig = toml::from_str(&content)
            .map_err(|e| FetchError::InvalidConfig(format!("{}: {e}", path.display())))?;

        info!(path = %path.display(), "Loaded configuration");
        config.validate()
    }

    /// Checks the configuration and normalizes the base URL.
    pub fn validate(mut self) -> Result<Self, FetchError> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| FetchError::InvalidConfig(format!("base_url {:?}: {e}", self.base_url)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::InvalidConfig(format!(
                "base_url must be http(s), got {}",
                url.scheme()
            )));
        }

        if !self.base_url.ends_with('/') {
            self.base_url.push('/');
        }

        if self.device_os.trim().is_empty() || self.device_id.trim().is_empty() {
            return Err(FetchError::InvalidConfig(
                "device_os and device_id must not be empty".to_string(),
            ));
        }

        Ok(self)
    }

    /// Builds the full URL for a relative API path.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Request timeout, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`ApiConfig`].
#[derive(Debug, Default)]
pub struct ApiConfigBuilder {
    config: ApiConfig,
}

impl ApiConfigBuilder {
    /// Sets the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Sets the `Device-OS` header value.
    pub fn device_os(mut self, os: impl Into<String>) -> Self {
        self.config.device_os = os.into();
        self
    }

    /// Sets the `Device-Id` header value.
    pub fn device_id(mut self, id: impl Into<String>) -> Self {
        self.config.device_id = id.into();
        self
    }

    /// Sets the refresh-and-retry budget per request.
    pub fn max_session_retries(mut self, retries: u32) -> Self {
        self.config.max_session_retries = retries;
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_secs = Some(timeout.as_secs());
        self
    }

    /// Sets the `User-Agent` header value.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(agent.into());
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> Result<ApiConfig, FetchError> {
        self.config.validate()
    }
}

// ============================================================================
// Tests
// ============================================================================
