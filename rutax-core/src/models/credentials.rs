//! Session credentials.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// The credential set used to talk to the API.
///
/// The set is always replaced as a whole. A refresh produces a new value via
/// [`Credentials::refreshed`] and never edits fields in place.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Current session token, sent as the `sessionId` header.
    pub session: String,
    /// Client secret used for refreshing the session.
    pub client_secret: String,
    /// Refresh token used for refreshing the session.
    pub refresh_token: String,
}

impl Credentials {
    /// Creates a new credential set.
    pub fn new(
        session: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            session: session.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
        }
    }

    /// Checks that all three fields are non-empty.
    pub fn validate(&self) -> Result<(), CoreError> {
        let missing: Vec<&str> = [
            ("session", &self.session),
            ("client_secret", &self.client_secret),
            ("refresh_token", &self.refresh_token),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CoreError::InvalidCredentials(format!(
                "empty field(s): {}",
                missing.join(", ")
            )))
        }
    }

    /// Returns the credential set that follows a successful refresh.
    ///
    /// The client secret is carried over unchanged.
    pub fn refreshed(&self, session: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            session: session.into(),
            client_secret: self.client_secret.clone(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("session", &redact(&self.session))
            .field("client_secret", &redact(&self.client_secret))
            .field("refresh_token", &redact(&self.refresh_token))
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() { "<empty>" } else { "<redacted>" }
}
