//! Receipt QR payloads.
//!
//! Receipt QR codes carry a query-string style payload:
//!
//! ```text
//! t=20200915T1518&s=1280.00&fn=9289000100408074&i=63297&fp=1471624783&n=1
//! ```
//!
//! | key  | meaning                         |
//! |------|---------------------------------|
//! | `t`  | purchase time (`YYYYMMDDTHHMM`) |
//! | `s`  | total, major units              |
//! | `fn` | fiscal drive number             |
//! | `i`  | fiscal document number          |
//! | `fp` | fiscal sign                     |
//! | `n`  | operation type                  |
//!
//! The raw string is what the API expects; the parsed fields exist for
//! display and sanity checks only.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::CoreError;

/// Timestamp layouts seen in receipt QR codes.
const TIMESTAMP_FORMATS: &[&str] = &["%Y%m%dT%H%M%S", "%Y%m%dT%H%M"];

/// A decoded receipt QR string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QrPayload {
    raw: String,
    fields: BTreeMap<String, String>,
}

impl QrPayload {
    /// Parses a payload string.
    ///
    /// Unknown keys and fragments without `=` are tolerated. Only an empty
    /// payload is rejected. The input is kept byte for byte, surrounding
    /// whitespace included.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidQrPayload("payload is empty".to_string()));
        }

        let fields = trimmed
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();

        Ok(Self {
            raw: raw.to_string(),
            fields,
        })
    }

    /// The payload exactly as it should be sent to the API.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Looks up a raw field value.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Purchase time (`t`).
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        let value = self.field("t")?;
        TIMESTAMP_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
    }

    /// Total (`s`) converted to minor units.
    ///
    /// `"1280.00"` becomes `128000`, `"12.5"` becomes `1250`.
    pub fn sum_minor(&self) -> Option<i64> {
        let value = self.field("s")?;
        let (negative, value) = match value.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, value),
        };
        let (whole, frac) = value.split_once('.').unwrap_or((value, ""));
        if frac.len() > 2
            || !whole.chars().all(|c| c.is_ascii_digit())
            || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }
        let whole: i64 = whole.parse().ok()?;
        let frac: i64 = if frac.is_empty() {
            0
        } else {
            format!("{frac:0<2}").parse().ok()?
        };
        let minor = whole.checked_mul(100)?.checked_add(frac)?;
        Some(if negative { -minor } else { minor })
    }

    /// Fiscal drive number (`fn`).
    pub fn fiscal_drive(&self) -> Option<&str> {
        self.field("fn")
    }

    /// Fiscal document number (`i`).
    pub fn fiscal_document(&self) -> Option<&str> {
        self.field("i")
    }

    /// Fiscal sign (`fp`).
    pub fn fiscal_sign(&self) -> Option<&str> {
        self.field("fp")
    }

    /// Operation type (`n`).
    pub fn operation_type(&self) -> Option<&str> {
        self.field("n")
    }
}

impl fmt::Display for QrPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
