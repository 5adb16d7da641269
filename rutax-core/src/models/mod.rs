//! Domain models for rutax.
//!
//! ## Submodules
//!
//! - [`credentials`] - Session credentials
//! - [`ticket`] - Ticket identifiers and details
//! - [`qr`] - Receipt QR payloads

mod credentials;
mod qr;
mod ticket;

pub use credentials::Credentials;
pub use qr::QrPayload;
pub use ticket::{Operation, Seller, TicketDetails, TicketId};
