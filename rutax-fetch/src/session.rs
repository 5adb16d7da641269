//! In-memory credential store.

use rutax_core::Credentials;
use std::sync::Arc;
use tokio::sync::RwLock;

struct Slot {
    credentials: Credentials,
    generation: u64,
}

/// Shared holder of the current credential set.
///
/// Readers get a copy; writers swap the whole set. Each replace bumps a
/// generation counter starting from zero at load time.
#[derive(Clone)]
pub struct CredentialStore {
    inner: Arc<RwLock<Slot>>,
}

impl CredentialStore {
    /// Creates a store holding freshly loaded credentials.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Slot {
                credentials,
                generation: 0,
            })),
        }
    }

    /// Returns a copy of the current credential set.
    pub async fn current(&self) -> Credentials {
        self.inner.read().await.credentials.clone()
    }

    /// Returns the current session token.
    pub async fn session(&self) -> String {
        self.inner.read().await.credentials.session.clone()
    }

    /// Replaces the credential set and returns the new generation.
    pub async fn replace(&self, credentials: Credentials) -> u64 {
        let mut slot = self.inner.write().await;
        slot.credentials = credentials;
        slot.generation += 1;
        slot.generation
    }

    /// Number of replacements since load.
    pub async fn generation(&self) -> u64 {
        self.inner.read().await.generation
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}
