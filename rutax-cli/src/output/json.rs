//! JSON output formatting.

use anyhow::Result;
use rutax_core::{QrPayload, TicketDetails, TicketId};
use serde::Serialize;

// ============================================================================
// Output Types
// ============================================================================

/// JSON output for a receipt.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketOutput<'a> {
    pub id: &'a str,
    pub status: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<&'a str>,
    pub operation_type: i64,
    /// Minor units, exactly as the API reports it.
    pub sum: i64,
    /// Major units with two decimals.
    pub sum_display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller_inn: Option<&'a str>,
}

/// JSON output for a resolved ticket id.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketIdOutput<'a> {
    pub ticket_id: &'a str,
}

/// JSON output for a decoded QR code.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadOutput<'a> {
    pub raw: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sum: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiscal_drive: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiscal_document: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiscal_sign: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<&'a str>,
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats receipt details.
    pub fn format_details(&self, details: &TicketDetails) -> Result<String> {
        self.format(&TicketOutput {
            id: &details.id,
            status: details.status,
            date: non_empty(&details.operation.date),
            operation_type: details.operation.kind,
            sum: details.operation.sum,
            sum_display: details.operation.sum_display(),
            seller_inn: non_empty(&details.seller.inn),
        })
    }

    /// Formats a resolved ticket id.
    pub fn format_ticket_id(&self, id: &TicketId) -> Result<String> {
        self.format(&TicketIdOutput {
            ticket_id: id.as_str(),
        })
    }

    /// Formats a decoded QR payload.
    pub fn format_payload(&self, payload: &QrPayload) -> Result<String> {
        self.format(&PayloadOutput {
            raw: payload.as_str(),
            timestamp: payload
                .timestamp()
                .map(|t| t.format("%Y-%m-%dT%H:%M:%S").to_string()),
            sum: payload.sum_minor(),
            fiscal_drive: payload.fiscal_drive(),
            fiscal_document: payload.fiscal_document(),
            fiscal_sign: payload.fiscal_sign(),
            operation_type: payload.operation_type(),
        })
    }
}
