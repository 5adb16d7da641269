// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # rutax Core
//!
//! Domain models shared by every rutax crate.
//!
//! ## Key Types
//!
//! ### Session
//! - [`Credentials`] - Session token, client secret and refresh token
//!
//! ### Receipts
//! - [`QrPayload`] - Decoded receipt QR string with its parsed fields
//! - [`TicketId`] - Opaque ticket identifier issued by the API
//! - [`TicketDetails`] - Receipt details (operation, seller)

pub mod error;
pub mod models;

pub use error::CoreError;

pub use models::{Credentials, Operation, QrPayload, Seller, TicketDetails, TicketId};
