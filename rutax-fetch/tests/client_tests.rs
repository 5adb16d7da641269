//! End-to-end tests for the request executor and ticket calls against a stub
//! API server.

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use reqwest::Method;
use image::DynamicImage;
use rutax_core::{Credentials, TicketId};
use rutax_fetch::{ApiConfig, FetchError, QrDecoder, QrError, TaxClient};
use rutax_store::{CredentialSink, StoreError, load_credentials, save_credentials};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

const STALE_SESSION: &str = "stale-session";
const FRESH_SESSION: &str = "fresh-session";
const FRESH_REFRESH: &str = "fresh-refresh";

// ============================================================================
// Stub Server
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behavior {
    /// Every request succeeds.
    Ok,
    /// 498 until the client presents the refreshed session.
    ExpireStale,
    /// 498 no matter what.
    AlwaysExpired,
    /// 403 on every ticket call.
    Forbidden,
}

struct Stub {
    behavior: Behavior,
    refresh_status: StatusCode,
    snake_case_refresh: bool,
    refresh_calls: AtomicUsize,
    ticket_calls: AtomicUsize,
    refresh_bodies: Mutex<Vec<Value>>,
    ticket_bodies: Mutex<Vec<Value>>,
    ticket_headers: Mutex<Vec<HeaderMap>>,
}

impl Stub {
    fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            refresh_status: StatusCode::OK,
            snake_case_refresh: false,
            refresh_calls: AtomicUsize::new(0),
            ticket_calls: AtomicUsize::new(0),
            refresh_bodies: Mutex::new(Vec::new()),
            ticket_bodies: Mutex::new(Vec::new()),
            ticket_headers: Mutex::new(Vec::new()),
        }
    }

    fn refreshes(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    fn ticket_requests(&self) -> usize {
        self.ticket_calls.load(Ordering::SeqCst)
    }

    /// Status for a ticket call, or `None` to serve the normal body.
    fn gate(&self, headers: &HeaderMap) -> Option<StatusCode> {
        let expired = StatusCode::from_u16(498).unwrap();
        let session = headers
            .get("sessionid")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        match self.behavior {
            Behavior::Ok => None,
            Behavior::ExpireStale if session == FRESH_SESSION => None,
            Behavior::ExpireStale | Behavior::AlwaysExpired => Some(expired),
            Behavior::Forbidden => Some(StatusCode::FORBIDDEN),
        }
    }
}

async fn refresh_handler(State(stub): State<Arc<Stub>>, Json(body): Json<Value>) -> Response {
    stub.refresh_calls.fetch_add(1, Ordering::SeqCst);
    stub.refresh_bodies.lock().unwrap().push(body);

    if stub.refresh_status != StatusCode::OK {
        return stub.refresh_status.into_response();
    }

    let payload = if stub.snake_case_refresh {
        json!({"session_id": FRESH_SESSION, "refresh_token": FRESH_REFRESH})
    } else {
        json!({"sessionId": FRESH_SESSION, "refresh_token": FRESH_REFRESH})
    };
    Json(payload).into_response()
}

async fn ticket_handler(
    State(stub): State<Arc<Stub>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    stub.ticket_calls.fetch_add(1, Ordering::SeqCst);
    stub.ticket_headers.lock().unwrap().push(headers.clone());
    stub.ticket_bodies.lock().unwrap().push(body.clone());

    if let Some(status) = stub.gate(&headers) {
        return status.into_response();
    }

    assert!(body["qr"].as_str().is_some_and(|qr| qr.starts_with("t=")));
    Json(json!({"id": "abc123"})).into_response()
}

async fn details_handler(
    State(stub): State<Arc<Stub>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    stub.ticket_calls.fetch_add(1, Ordering::SeqCst);

    if let Some(status) = stub.gate(&headers) {
        return status.into_response();
    }

    Json(json!({
        "id": id,
        "status": 1,
        "operation": {"date": "2020-09-15", "type": 1, "sum": 128000},
        "seller": {"inn": "123456789012"}
    }))
    .into_response()
}

async fn raw_handler(State(stub): State<Arc<Stub>>, headers: HeaderMap) -> Response {
    if let Some(status) = stub.gate(&headers) {
        return status.into_response();
    }
    let device = headers
        .get("device-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    (StatusCode::OK, format!("\u{0}raw body for {device}\u{7f}")).into_response()
}

async fn spawn_stub(stub: Arc<Stub>) -> String {
    let app = Router::new()
        .route("/v2/mobile/users/refresh", post(refresh_handler))
        .route("/v2/ticket", post(ticket_handler))
        .route("/v2/tickets/:id", get(details_handler))
        .route("/v2/raw", get(raw_handler))
        .with_state(stub);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}/v2/")
}

// ============================================================================
// Test Sinks
// ============================================================================

#[derive(Default)]
struct CountingSink {
    calls: AtomicUsize,
    last: Mutex<Option<Credentials>>,
}

#[async_trait]
impl CredentialSink for CountingSink {
    async fn persist(&self, credentials: Credentials) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(credentials);
        Ok(())
    }
}

/// Holds every write until the test opens the gate.
#[derive(Default)]
struct GatedSink {
    entered: Notify,
    gate: Notify,
}

#[async_trait]
impl CredentialSink for GatedSink {
    async fn persist(&self, _credentials: Credentials) -> Result<(), StoreError> {
        self.entered.notify_one();
        self.gate.notified().await;
        Ok(())
    }
}

struct FailingSink;

#[async_trait]
impl CredentialSink for FailingSink {
    async fn persist(&self, _credentials: Credentials) -> Result<(), StoreError> {
        Err(StoreError::PersisterHalted("disk full".to_string()))
    }
}

/// Decoder that ignores the image and returns a fixed result.
struct FixedDecoder(Option<&'static str>);

impl QrDecoder for FixedDecoder {
    fn decode(&self, _image: &DynamicImage) -> Result<String, QrError> {
        self.0.map(str::to_string).ok_or(QrError::NotFound)
    }
}

fn stale_credentials() -> Credentials {
    Credentials::new(STALE_SESSION, "client-secret", "stale-refresh")
}

fn client_for(base_url: &str, sink: Arc<dyn CredentialSink>) -> TaxClient {
    let config = ApiConfig::builder().base_url(base_url).build().unwrap();
    TaxClient::builder(stale_credentials(), sink)
        .config(config)
        .build()
        .unwrap()
}

// ============================================================================
// Request Executor
// ============================================================================

#[tokio::test]
async fn test_success_body_returned_unmodified() {
    let stub = Arc::new(Stub::new(Behavior::Ok));
    let url = spawn_stub(stub.clone()).await;
    let client = client_for(&url, Arc::new(CountingSink::default()));

    let body = client.execute(Method::GET, "raw", None, None).await.unwrap();

    assert_eq!(&body[..], "\u{0}raw body for 1234\u{7f}".as_bytes());
    assert_eq!(stub.refreshes(), 0);
}

#[tokio::test]
async fn test_extra_headers_override_defaults() {
    let stub = Arc::new(Stub::new(Behavior::Ok));
    let url = spawn_stub(stub.clone()).await;
    let client = client_for(&url, Arc::new(CountingSink::default()));

    let mut extra = reqwest::header::HeaderMap::new();
    extra.insert("device-id", "override".parse().unwrap());

    let body = client
        .execute(Method::GET, "raw", None, Some(&extra))
        .await
        .unwrap();

    assert_eq!(&body[..], "\u{0}raw body for override\u{7f}".as_bytes());
}

#[tokio::test]
async fn test_expired_session_refreshes_once_and_retries() {
    let stub = Arc::new(Stub::new(Behavior::ExpireStale));
    let url = spawn_stub(stub.clone()).await;
    let sink = Arc::new(CountingSink::default());
    let client = client_for(&url, sink.clone());

    let id = client
        .resolve_ticket_id("t=20200915T1518&s=1280.00&fn=...")
        .await
        .unwrap();

    assert_eq!(id.as_str(), "abc123");
    assert_eq!(stub.refreshes(), 1);
    assert_eq!(stub.ticket_requests(), 2);
    assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    assert_eq!(client.credentials().generation().await, 1);

    // The refresh call carried the old secret and refresh token.
    let refresh_body = stub.refresh_bodies.lock().unwrap()[0].clone();
    assert_eq!(
        refresh_body,
        json!({"client_secret": "client-secret", "refresh_token": "stale-refresh"})
    );

    // The retry used the new session; the secret survived the refresh.
    let headers = stub.ticket_headers.lock().unwrap();
    assert_eq!(headers[0]["sessionid"], STALE_SESSION);
    assert_eq!(headers[1]["sessionid"], FRESH_SESSION);

    let persisted = sink.last.lock().unwrap().clone().unwrap();
    assert_eq!(persisted.session, FRESH_SESSION);
    assert_eq!(persisted.refresh_token, FRESH_REFRESH);
    assert_eq!(persisted.client_secret, "client-secret");
}

#[tokio::test]
async fn test_error_status_fails_without_refresh() {
    let stub = Arc::new(Stub::new(Behavior::Forbidden));
    let url = spawn_stub(stub.clone()).await;
    let sink = Arc::new(CountingSink::default());
    let client = client_for(&url, sink.clone());

    let err = client
        .resolve_ticket_id("t=20200915T1518&s=1280.00")
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Status { code: 403, .. }));
    assert_eq!(err.status_code(), Some(403));
    assert!(err.to_string().contains("403"));
    assert_eq!(stub.refreshes(), 0);
    assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
    assert_eq!(client.credentials().generation().await, 0);
}

#[tokio::test]
async fn test_persistent_expiry_is_bounded() {
    let stub = Arc::new(Stub::new(Behavior::AlwaysExpired));
    let url = spawn_stub(stub.clone()).await;
    let client = client_for(&url, Arc::new(CountingSink::default()));

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        client.fetch_ticket_details(&TicketId::new("abc123")),
    )
    .await
    .expect("request must not loop forever");

    let err = result.unwrap_err();
    assert!(err.is_session_expired());
    assert!(matches!(err, FetchError::SessionExpired { attempts: 2 }));
    assert_eq!(stub.refreshes(), 1);
    assert_eq!(stub.ticket_requests(), 2);
}

#[tokio::test]
async fn test_zero_retry_budget_skips_refresh() {
    let stub = Arc::new(Stub::new(Behavior::ExpireStale));
    let url = spawn_stub(stub.clone()).await;
    let config = ApiConfig::builder()
        .base_url(&url)
        .max_session_retries(0)
        .build()
        .unwrap();
    let client = TaxClient::builder(stale_credentials(), Arc::new(CountingSink::default()))
        .config(config)
        .build()
        .unwrap();

    let err = client.execute(Method::GET, "raw", None, None).await.unwrap_err();

    assert!(matches!(err, FetchError::SessionExpired { attempts: 1 }));
    assert_eq!(stub.refreshes(), 0);
}

#[tokio::test]
async fn test_concurrent_expiry_refreshes_once() {
    let stub = Arc::new(Stub::new(Behavior::ExpireStale));
    let url = spawn_stub(stub.clone()).await;
    let sink = Arc::new(CountingSink::default());
    let client = Arc::new(client_for(&url, sink.clone()));

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.execute(Method::GET, "raw", None, None).await })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(stub.refreshes(), 1);
    assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Refresh
// ============================================================================

#[tokio::test]
async fn test_refresh_waits_for_persist_ack() {
    let stub = Arc::new(Stub::new(Behavior::Ok));
    let url = spawn_stub(stub.clone()).await;
    let sink = Arc::new(GatedSink::default());
    let client = Arc::new(client_for(&url, sink.clone()));

    let task = {
        let client = client.clone();
        tokio::spawn(async move { client.refresh().await })
    };

    sink.entered.notified().await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!task.is_finished(), "refresh returned before the write was acknowledged");

    // In-memory state is already replaced while the write is pending.
    assert_eq!(client.credentials().session().await, FRESH_SESSION);

    sink.gate.notify_one();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_refresh_accepts_snake_case_session() {
    let mut stub = Stub::new(Behavior::Ok);
    stub.snake_case_refresh = true;
    let stub = Arc::new(stub);
    let url = spawn_stub(stub.clone()).await;
    let client = client_for(&url, Arc::new(CountingSink::default()));

    client.refresh().await.unwrap();

    assert_eq!(client.credentials().session().await, FRESH_SESSION);
}

#[tokio::test]
async fn test_refresh_rejected_keeps_credentials() {
    let mut stub = Stub::new(Behavior::ExpireStale);
    stub.refresh_status = StatusCode::UNAUTHORIZED;
    let stub = Arc::new(stub);
    let url = spawn_stub(stub.clone()).await;
    let sink = Arc::new(CountingSink::default());
    let client = client_for(&url, sink.clone());

    let err = client
        .resolve_ticket_id("t=20200915T1518&s=1280.00")
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::RefreshFailed(_)));
    assert_eq!(client.credentials().session().await, STALE_SESSION);
    assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_persist_failure_is_surfaced() {
    let stub = Arc::new(Stub::new(Behavior::Ok));
    let url = spawn_stub(stub.clone()).await;
    let client = client_for(&url, Arc::new(FailingSink));

    let err = client.refresh().await.unwrap_err();

    assert!(matches!(err, FetchError::Store(StoreError::PersisterHalted(_))));
    // The new session is live in memory even though it is not durable.
    assert_eq!(client.credentials().session().await, FRESH_SESSION);
}

// ============================================================================
// Tickets
// ============================================================================

#[tokio::test]
async fn test_resolve_ticket_id() {
    let stub = Arc::new(Stub::new(Behavior::Ok));
    let url = spawn_stub(stub.clone()).await;
    let client = client_for(&url, Arc::new(CountingSink::default()));

    let id = client
        .resolve_ticket_id("t=20200915T1518&s=1280.00&fn=...")
        .await
        .unwrap();

    assert_eq!(id, TicketId::new("abc123"));

    let headers = stub.ticket_headers.lock().unwrap();
    assert_eq!(headers[0]["device-os"], "Android");
    assert_eq!(headers[0]["device-id"], "1234");
    assert_eq!(headers[0]["content-type"], "application/json");
}

#[tokio::test]
async fn test_fetch_ticket_details() {
    let stub = Arc::new(Stub::new(Behavior::Ok));
    let url = spawn_stub(stub.clone()).await;
    let client = client_for(&url, Arc::new(CountingSink::default()));

    let details = client
        .fetch_ticket_details(&TicketId::new("abc123"))
        .await
        .unwrap();

    assert_eq!(details.id, "abc123");
    assert_eq!(details.status, 1);
    assert_eq!(details.operation.date, "2020-09-15");
    assert_eq!(details.operation.sum, 128_000);
    assert_eq!(details.operation.sum_display(), "1280.00");
    assert_eq!(details.seller.inn, "123456789012");
}

// ============================================================================
// Image to Details
// ============================================================================

#[tokio::test]
async fn test_resolve_from_image_chains_both_calls() {
    let stub = Arc::new(Stub::new(Behavior::Ok));
    let url = spawn_stub(stub.clone()).await;
    let client = client_for(&url, Arc::new(CountingSink::default()));

    let decoded = "t=20200915T1518&s=1280.00&fn=1 \n";
    let image = DynamicImage::new_luma8(8, 8);
    let details = client
        .resolve_from_image(&FixedDecoder(Some(decoded)), &image)
        .await
        .unwrap();

    assert_eq!(details.id, "abc123");
    assert_eq!(details.operation.sum, 128_000);
    assert_eq!(stub.ticket_requests(), 2);

    // The decoder output reaches the API untouched.
    let bodies = stub.ticket_bodies.lock().unwrap();
    assert_eq!(bodies[0]["qr"], decoded);
}

#[tokio::test]
async fn test_resolve_from_image_without_code() {
    let stub = Arc::new(Stub::new(Behavior::Ok));
    let url = spawn_stub(stub.clone()).await;
    let client = client_for(&url, Arc::new(CountingSink::default()));

    let err = client
        .resolve_from_image(&FixedDecoder(None), &DynamicImage::new_luma8(8, 8))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Qr(QrError::NotFound)));
    assert_eq!(stub.ticket_requests(), 0);
}

#[tokio::test]
async fn test_resolve_from_file_missing_image() {
    let stub = Arc::new(Stub::new(Behavior::Ok));
    let url = spawn_stub(stub.clone()).await;
    let client = client_for(&url, Arc::new(CountingSink::default()));

    let err = client
        .resolve_from_file(&FixedDecoder(Some("t=1")), "/nonexistent/qr.jpg")
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Qr(QrError::Image(_))));
    assert_eq!(stub.ticket_requests(), 0);
}

#[tokio::test]
async fn test_resolve_from_file_decodes_saved_image() {
    let stub = Arc::new(Stub::new(Behavior::Ok));
    let url = spawn_stub(stub.clone()).await;
    let client = client_for(&url, Arc::new(CountingSink::default()));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("qr.png");
    DynamicImage::new_luma8(16, 16).save(&path).unwrap();

    let details = client
        .resolve_from_file(&FixedDecoder(Some("t=20200915T1518&s=1280.00")), &path)
        .await
        .unwrap();

    assert_eq!(details.operation.sum_display(), "1280.00");
}

// ============================================================================
// File-backed Client
// ============================================================================

#[tokio::test]
async fn test_from_file_persists_refresh() {
    let stub = Arc::new(Stub::new(Behavior::ExpireStale));
    let url = spawn_stub(stub.clone()).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credentials.toml");
    save_credentials(&path, &stale_credentials()).await.unwrap();

    let config = ApiConfig::builder().base_url(&url).build().unwrap();
    let client = TaxClient::from_file(&path, config).await.unwrap();

    let details = client
        .fetch_ticket_details(&TicketId::new("abc123"))
        .await
        .unwrap();
    assert_eq!(details.operation.sum, 128_000);

    // refresh() returned only after the write, so the file is current.
    let on_disk = load_credentials(&path).await.unwrap();
    assert_eq!(on_disk.session, FRESH_SESSION);
    assert_eq!(on_disk.refresh_token, FRESH_REFRESH);
    assert_eq!(on_disk.client_secret, "client-secret");
}
