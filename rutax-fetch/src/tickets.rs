//! Ticket lookup.
//!
//! Two calls take a receipt from QR payload to details:
//!
//! 1. `POST ticket` with `{"qr": "<payload>"}` returns `{"id": "..."}`
//! 2. `GET tickets/{id}` returns the receipt details

use image::DynamicImage;
use reqwest::Method;
use rutax_core::{QrPayload, TicketDetails, TicketId};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument};

use crate::client::TaxClient;
use crate::error::FetchError;
use crate::qr::{QrDecoder, open_image};

/// Ticket resolution endpoint.
const TICKET_PATH: &str = "ticket";

#[derive(Serialize)]
struct TicketRequest<'a> {
    qr: &'a str,
}

#[derive(Deserialize)]
struct TicketResponse {
    #[serde(default)]
    id: String,
}

impl TaxClient {
    /// Resolves a QR payload string to a ticket id.
    #[instrument(skip_all)]
    pub async fn resolve_ticket_id(&self, qr_payload: &str) -> Result<TicketId, FetchError> {
        let body = serde_json::to_vec(&TicketRequest { qr: qr_payload })?;
        let response = self
            .execute(Method::POST, TICKET_PATH, Some(body.into()), None)
            .await?;

        let parsed: TicketResponse = serde_json::from_slice(&response)?;
        if parsed.id.is_empty() {
            return Err(FetchError::InvalidResponse(
                "ticket response has no id".to_string(),
            ));
        }

        info!(ticket_id = %parsed.id, "Resolved ticket id");
        Ok(TicketId::new(parsed.id))
    }

    /// Fetches the details of a ticket.
    #[instrument(skip_all, fields(ticket_id = %ticket_id))]
    pub async fn fetch_ticket_details(
        &self,
        ticket_id: &TicketId,
    ) -> Result<TicketDetails, FetchError> {
        let path = format!("tickets/{ticket_id}");
        let response = self.execute(Method::GET, &path, None, None).await?;

        let details: TicketDetails = serde_json::from_slice(&response)?;
        debug!(
            status = details.status,
            sum = details.operation.sum,
            "Fetched ticket details"
        );
        Ok(details)
    }

    /// Decodes the QR code in `image` and fetches the receipt it points to.
    #[instrument(skip_all)]
    pub async fn resolve_from_image<D: QrDecoder + ?Sized>(
        &self,
        decoder: &D,
        image: &DynamicImage,
    ) -> Result<TicketDetails, FetchError> {
        let payload = QrPayload::parse(&decoder.decode(image)?)?;
        debug!(
            timestamp = ?payload.timestamp(),
            sum = ?payload.sum_minor(),
            "Decoded receipt QR code"
        );

        let ticket_id = self.resolve_ticket_id(payload.as_str()).await?;
        self.fetch_ticket_details(&ticket_id).await
    }

    /// Opens an image file and resolves the receipt in it.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn resolve_from_file<D: QrDecoder + ?Sized>(
        &self,
        decoder: &D,
        path: impl AsRef<Path>,
    ) -> Result<TicketDetails, FetchError> {
        let image = open_image(path.as_ref())?;
        self.resolve_from_image(decoder, &image).await
    }
}
