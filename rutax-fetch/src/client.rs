//! Request executor with session refresh.
//!
//! Every request carries the device headers and the current session token.
//! The API answers 498 once a session expires; the client then refreshes the
//! session, waits for the new credentials to be persisted, and sends the same
//! request again. The number of refresh-and-retry cycles per request is
//! capped by [`ApiConfig::max_session_retries`].

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode};
use rutax_core::Credentials;
use rutax_store::{CredentialPersister, CredentialSink, load_credentials};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::config::{ApiConfig, SESSION_EXPIRED_STATUS};
use crate::error::FetchError;
use crate::session::CredentialStore;

// ============================================================================
// Constants
// ============================================================================

/// Session refresh endpoint.
const REFRESH_PATH: &str = "mobile/users/refresh";

/// JSON content type sent with every request.
const JSON_CONTENT_TYPE: &str = "application/json";

/// Device OS header.
const DEVICE_OS_HEADER: HeaderName = HeaderName::from_static("device-os");

/// Device id header.
const DEVICE_ID_HEADER: HeaderName = HeaderName::from_static("device-id");

/// Session token header.
const SESSION_HEADER: HeaderName = HeaderName::from_static("sessionid");

// ============================================================================
// Refresh Wire Types
// ============================================================================

#[derive(Serialize)]
struct RefreshRequest<'a> {
    client_secret: &'a str,
    refresh_token: &'a str,
}

/// Deployments disagree on the session field name, so both are accepted.
#[derive(Deserialize)]
struct RefreshResponse {
    #[serde(rename = "sessionId", alias = "session_id", default)]
    session: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

// ============================================================================
// Tax Client
// ============================================================================

/// Client for the receipt API.
pub struct TaxClient {
    http: Client,
    config: ApiConfig,
    credentials: CredentialStore,
    sink: Arc<dyn CredentialSink>,
    refresh_lock: Mutex<()>,
}

impl TaxClient {
    /// Starts building a client around loaded credentials and a sink for
    /// refreshed ones.
    pub fn builder(credentials: Credentials, sink: Arc<dyn CredentialSink>) -> TaxClientBuilder {
        TaxClientBuilder {
            credentials,
            sink,
            config: ApiConfig::default(),
            http: None,
        }
    }

    /// Loads credentials from `path` and persists refreshes back to it.
    ///
    /// Spawns the credential persister, so this must run inside a tokio
    /// runtime.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn from_file(path: impl AsRef<Path>, config: ApiConfig) -> Result<Self, FetchError> {
        let path = path.as_ref();
        let credentials = load_credentials(path).await?;
        let persister = CredentialPersister::spawn(path);

        Self::builder(credentials, Arc::new(persister))
            .config(config)
            .build()
    }

    /// The active configuration.
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// The in-memory credential store.
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    // ========================================================================
    // Request Execution
    // ========================================================================

    /// Sends a request to `path` relative to the base URL and returns the
    /// response body.
    ///
    /// `extra_headers` are applied after the standard headers and replace
    /// them on conflict. A 498 response triggers a session refresh and a
    /// retry of the identical request; any status outside `200..400` fails
    /// without retrying.
    #[instrument(skip_all, fields(method = %method, path = %path))]
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Bytes>,
        extra_headers: Option<&HeaderMap>,
    ) -> Result<Bytes, FetchError> {
        let url = self.config.endpoint(path);
        let mut refreshes = 0u32;

        loop {
            let session = self.credentials.session().await;
            let response = self
                .send(method.clone(), &url, body.clone(), &session, extra_headers)
                .await?;

            if response.status().as_u16() != SESSION_EXPIRED_STATUS {
                let response = check_status(response)?;
                return Ok(response.bytes().await?);
            }

            if refreshes >= self.config.max_session_retries {
                warn!(attempts = refreshes + 1, "Session still expired, giving up");
                return Err(FetchError::SessionExpired {
                    attempts: refreshes + 1,
                });
            }

            warn!("Session expired, refreshing");
            self.refresh_if_current(&session).await?;
            refreshes += 1;
        }
    }

    /// Refreshes the session unconditionally.
    ///
    /// Returns after the new credentials are in memory and the sink has
    /// acknowledged them.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<(), FetchError> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Refreshes unless another task already replaced `stale_session`.
    async fn refresh_if_current(&self, stale_session: &str) -> Result<(), FetchError> {
        let _guard = self.refresh_lock.lock().await;

        if self.credentials.session().await != stale_session {
            debug!("Session already refreshed by another request");
            return Ok(());
        }

        self.refresh_locked().await
    }

    /// Performs the refresh call. Callers hold `refresh_lock`.
    async fn refresh_locked(&self) -> Result<(), FetchError> {
        let current = self.credentials.current().await;
        let body = serde_json::to_vec(&RefreshRequest {
            client_secret: &current.client_secret,
            refresh_token: &current.refresh_token,
        })?;

        // Single shot: a 498 here is a failure, never another refresh.
        let url = self.config.endpoint(REFRESH_PATH);
        let response = self
            .send(Method::POST, &url, Some(body.into()), &current.session, None)
            .await?;
        let response = check_status(response).map_err(|e| match e {
            FetchError::Status { code, reason } => {
                FetchError::RefreshFailed(format!("HTTP status {code}: {reason}"))
            }
            other => other,
        })?;

        let payload: RefreshResponse = serde_json::from_slice(&response.bytes().await?)?;
        let session = payload
            .session
            .filter(|s| !s.is_empty())
            .ok_or_else(|| FetchError::RefreshFailed("response has no session id".to_string()))?;
        let refresh_token = payload
            .refresh_token
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| current.refresh_token.clone());

        let next = current.refreshed(session, refresh_token);
        next.validate()?;

        let generation = self.credentials.replace(next.clone()).await;
        info!(generation, "Session refreshed");

        self.sink.persist(next).await?;
        debug!(generation, "Refreshed credentials persisted");
        Ok(())
    }

    // ========================================================================
    // Transport
    // ========================================================================

    fn base_headers(&self, session: &str) -> Result<HeaderMap, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(DEVICE_OS_HEADER, header_value(&self.config.device_os)?);
        headers.insert(DEVICE_ID_HEADER, header_value(&self.config.device_id)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        headers.insert(SESSION_HEADER, header_value(session)?);
        Ok(headers)
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<Bytes>,
        session: &str,
        extra_headers: Option<&HeaderMap>,
    ) -> Result<Response, FetchError> {
        let mut headers = self.base_headers(session)?;
        if let Some(extra) = extra_headers {
            for (name, value) in extra {
                headers.insert(name.clone(), value.clone());
            }
        }

        let mut request = self.http.request(method, url).headers(headers);
        if let Some(body) = body {
            request = request.body(body);
        }

        debug!(url = %url, "Sending request");
        let response = request.send().await?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }
}

impl std::fmt::Debug for TaxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaxClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn header_value(value: &str) -> Result<HeaderValue, FetchError> {
    HeaderValue::from_str(value).map_err(|e| FetchError::InvalidHeader(e.to_string()))
}

/// Returns true for statuses in `200..400`.
fn is_success(status: StatusCode) -> bool {
    (200..400).contains(&status.as_u16())
}

fn check_status(response: Response) -> Result<Response, FetchError> {
    let status = response.status();
    if is_success(status) {
        return Ok(response);
    }

    Err(FetchError::Status {
        code: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
    })
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`TaxClient`].
pub struct TaxClientBuilder {
    credentials: Credentials,
    sink: Arc<dyn CredentialSink>,
    config: ApiConfig,
    http: Option<Client>,
}

impl TaxClientBuilder {
    /// Sets the API configuration.
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses a caller-supplied HTTP client. Its own timeout settings apply.
    pub fn http_client(mut self, client: Client) -> Self {
        self.http = Some(client);
        self
    }

    /// Builds the client.
    pub fn build(self) -> Result<TaxClient, FetchError> {
        let config = self.config.validate()?;
        self.credentials.validate()?;

        let http = match self.http {
            Some(client) => client,
            None => {
                let mut builder = Client::builder().user_agent(
                    config
                        .user_agent
                        .clone()
                        .unwrap_or_else(|| concat!("rutax/", env!("CARGO_PKG_VERSION")).to_string()),
                );
                if let Some(timeout) = config.timeout() {
                    builder = builder.timeout(timeout);
                }
                builder.build()?
            }
        };

        Ok(TaxClient {
            http,
            config,
            credentials: CredentialStore::new(self.credentials),
            sink: self.sink,
            refresh_lock: Mutex::new(()),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rutax_store::StoreError;

    struct NullSink;

    #[async_trait]
    impl CredentialSink for NullSink {
        async fn persist(&self, _credentials: Credentials) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn client(config: ApiConfig) -> TaxClient {
        TaxClient::builder(Credentials::new("s", "c", "r"), Arc::new(NullSink))
            .config(config)
            .build()
            .unwrap()
    }

    #[test]
    fn test_success_range() {
        assert!(is_success(StatusCode::OK));
        assert!(is_success(StatusCode::NO_CONTENT));
        assert!(is_success(StatusCode::FOUND));
        assert!(!is_success(StatusCode::BAD_REQUEST));
        assert!(!is_success(StatusCode::CONTINUE));
        assert!(!is_success(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn test_base_headers() {
        let client = client(ApiConfig::builder().device_id("42").build().unwrap());
        let headers = client.base_headers("token").unwrap();

        assert_eq!(headers["device-os"], "Android");
        assert_eq!(headers["device-id"], "42");
        assert_eq!(headers["content-type"], "application/json");
        assert_eq!(headers["sessionid"], "token");
    }

    #[test]
    fn test_invalid_session_header() {
        let client = client(ApiConfig::default());
        assert!(matches!(
            client.base_headers("bad\nvalue"),
            Err(FetchError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_build_rejects_empty_credentials() {
        let result = TaxClient::builder(Credentials::new("", "c", "r"), Arc::new(NullSink)).build();
        assert!(matches!(result, Err(FetchError::Core(_))));
    }

    #[test]
    fn test_refresh_response_field_names() {
        let camel: RefreshResponse =
            serde_json::from_str(r#"{"sessionId":"a","refresh_token":"b"}"#).unwrap();
        assert_eq!(camel.session.as_deref(), Some("a"));

        let snake: RefreshResponse =
            serde_json::from_str(r#"{"session_id":"a","refresh_token":"b"}"#).unwrap();
        assert_eq!(snake.session.as_deref(), Some("a"));
        assert_eq!(snake.refresh_token.as_deref(), Some("b"));
    }
}
