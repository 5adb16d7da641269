//! Ticket types.
//!
//! A ticket is the authority's record of one receipt. The API first maps a QR
//! payload to a [`TicketId`], then serves [`TicketDetails`] for that id.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ============================================================================
// Ticket Id
// ============================================================================

/// Opaque ticket identifier issued by the API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(String);

impl TicketId {
    /// Wraps a raw identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the id and returns the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TicketId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for TicketId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl AsRef<str> for TicketId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Ticket Details
// ============================================================================

/// Receipt details returned by `GET tickets/{id}`.
///
/// Missing fields decode to their defaults, matching how lenient the API is
/// about partially processed tickets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketDetails {
    /// Ticket id.
    pub id: String,
    /// Processing status code reported by the authority.
    #[serde(deserialize_with = "integral_number")]
    pub status: i64,
    /// The sale operation.
    pub operation: Operation,
    /// The seller.
    pub seller: Seller,
}

/// The sale operation recorded on a receipt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Operation {
    /// Operation date as reported by the API.
    pub date: String,
    /// Operation type code (1 = sale, 2 = sale return, ...).
    #[serde(rename = "type", deserialize_with = "integral_number")]
    pub kind: i64,
    /// Total in minor currency units (kopecks).
    #[serde(deserialize_with = "integral_number")]
    pub sum: i64,
}

impl Operation {
    /// Formats the sum in major units with two decimals.
    ///
    /// `128000` becomes `"1280.00"`.
    pub fn sum_display(&self) -> String {
        let sign = if self.sum < 0 { "-" } else { "" };
        let abs = self.sum.unsigned_abs();
        format!("{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

/// The seller on a receipt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Seller {
    /// Taxpayer identification number.
    pub inn: String,
}

// ============================================================================
// Lenient Numbers
// ============================================================================

/// Accepts `128000` as well as `128000.0`; some deployments send every
/// number as a float. Fractional values are rejected.
fn integral_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    struct IntegralVisitor;

    impl Visitor<'_> for IntegralVisitor {
        type Value = i64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an integral number")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
            i64::try_from(v).map_err(|_| E::custom(format!("{v} is out of range")))
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> {
            if v.fract() != 0.0 || !v.is_finite() || v.abs() > i64::MAX as f64 {
                return Err(E::custom(format!("{v} is not an integral number")));
            }
            Ok(v as i64)
        }
    }

    deserializer.deserialize_any(IntegralVisitor)
}

// ============================================================================
// Tests
// ============================================================================
