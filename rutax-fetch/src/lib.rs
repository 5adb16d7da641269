// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # rutax Fetch
//!
//! HTTP access to the tax-authority receipt API.
//!
//! ## Request Path
//!
//! - [`client::TaxClient`] - Sends requests with the device/session headers,
//!   refreshes the session on status 498 and retries once
//! - [`session::CredentialStore`] - In-memory credential set, replaced whole
//! - [`config::ApiConfig`] - Base URL, device identity and retry budget
//!
//! ## Tickets
//!
//! - [`TaxClient::resolve_ticket_id`] - QR payload to ticket id
//! - [`TaxClient::fetch_ticket_details`] - Ticket id to receipt details
//! - [`TaxClient::resolve_from_image`] - Image to receipt details via a [`QrDecoder`]
//!
//! ## Example
//!
//! ```ignore
//! use rutax_fetch::{ApiConfig, RqrrDecoder, TaxClient};
//!
//! let client = TaxClient::from_file("credentials.toml", ApiConfig::default()).await?;
//! let details = client.resolve_from_file(&RqrrDecoder, "qr.jpg").await?;
//! println!("{} RUB", details.operation.sum_display());
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod qr;
pub mod session;
pub mod tickets;

pub use client::{TaxClient, TaxClientBuilder};
pub use config::{ApiConfig, ApiConfigBuilder, SESSION_EXPIRED_STATUS};
pub use error::{FetchError, QrError};
pub use qr::{QrDecoder, RqrrDecoder, open_image};
pub use session::CredentialStore;
