//! Single-writer credential persister.
//!
//! One background task owns the credential file. Writers hand it a new
//! credential set and wait for the write to finish:
//!
//! ```text
//!  refresh() ──persist(creds)──► [queue, depth 1] ──► persister task
//!      ▲                                                  │ save_credentials
//!      └──────────────── ack: Result<(), StoreError> ◄────┘
//! ```
//!
//! A failed write is reported through the ack, logged, and halts the task:
//! every later `persist` fails with [`StoreError::PersisterHalted`] and the
//! halted state is visible through [`PersisterHandle::subscribe`].

use async_trait::async_trait;
use rutax_core::Credentials;
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info};

use crate::error::StoreError;
use crate::persistence::save_credentials;

// ============================================================================
// Credential Sink
// ============================================================================

/// Destination for refreshed credentials.
///
/// `persist` resolves only after the credentials are durable (or failed to
/// become durable).
#[async_trait]
pub trait CredentialSink: Send + Sync {
    /// Stores a new credential set, replacing the previous one.
    async fn persist(&self, credentials: Credentials) -> Result<(), StoreError>;
}

// ============================================================================
// Status
// ============================================================================

/// Observable state of the persister task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersisterStatus {
    /// Accepting writes.
    Running,
    /// A write failed; no further writes are attempted.
    Halted {
        /// Error message of the failed write.
        reason: String,
    },
}

impl PersisterStatus {
    /// Returns true if the persister still accepts writes.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

// ============================================================================
// Persister Task
// ============================================================================

struct PersistRequest {
    credentials: Credentials,
    ack: oneshot::Sender<Result<(), StoreError>>,
}

/// Spawns the background writer for a credential file.
pub struct CredentialPersister;

impl CredentialPersister {
    /// Spawns the persister task on the current tokio runtime.
    ///
    /// The task stops once every [`PersisterHandle`] is dropped.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn(path: impl Into<PathBuf>) -> PersisterHandle {
        let path = path.into();
        let (tx, rx) = mpsc::channel(1);
        let (status_tx, status_rx) = watch::channel(PersisterStatus::Running);

        tokio::spawn(run(path.clone(), rx, status_tx));
        info!(path = %path.display(), "Credential persister started");

        PersisterHandle {
            tx,
            status: status_rx,
            path,
        }
    }
}

async fn run(
    path: PathBuf,
    mut rx: mpsc::Receiver<PersistRequest>,
    status: watch::Sender<PersisterStatus>,
) {
    while let Some(request) = rx.recv().await {
        let halted = match &*status.borrow() {
            PersisterStatus::Halted { reason } => Some(reason.clone()),
            PersisterStatus::Running => None,
        };
        if let Some(reason) = halted {
            let _ = request.ack.send(Err(StoreError::PersisterHalted(reason)));
            continue;
        }

        match save_credentials(&path, &request.credentials).await {
            Ok(()) => {
                debug!(path = %path.display(), "Credentials persisted");
                let _ = request.ack.send(Ok(()));
            }
            Err(e) => {
                error!(
                    path = %path.display(),
                    error = %e,
                    "Failed to persist credentials, halting persister"
                );
                status.send_replace(PersisterStatus::Halted {
                    reason: e.to_string(),
                });
                let _ = request.ack.send(Err(e));
            }
        }
    }

    debug!(path = %path.display(), "Credential persister stopped");
}

// ============================================================================
// Handle
// ============================================================================

/// Cloneable handle to a running persister.
#[derive(Debug, Clone)]
pub struct PersisterHandle {
    tx: mpsc::Sender<PersistRequest>,
    status: watch::Receiver<PersisterStatus>,
    path: PathBuf,
}

impl PersisterHandle {
    /// The file this persister writes to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current persister status.
    pub fn status(&self) -> PersisterStatus {
        self.status.borrow().clone()
    }

    /// Subscribes to status changes.
    pub fn subscribe(&self) -> watch::Receiver<PersisterStatus> {
        self.status.clone()
    }
}

#[async_trait]
impl CredentialSink for PersisterHandle {
    async fn persist(&self, credentials: Credentials) -> Result<(), StoreError> {
        if let PersisterStatus::Halted { reason } = self.status() {
            return Err(StoreError::PersisterHalted(reason));
        }

        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(PersistRequest {
                credentials,
                ack: ack_tx,
            })
            .await
            .map_err(|_| StoreError::PersisterGone)?;

        ack_rx.await.map_err(|_| StoreError::PersisterGone)?
    }
}

// ============================================================================
// Tests
// ============================================================================
