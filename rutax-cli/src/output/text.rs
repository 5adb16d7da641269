//! Text output formatting with colors.

use rutax_core::{QrPayload, TicketDetails};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Formats receipt details.
    pub fn format_details(&self, details: &TicketDetails) -> String {
        let mut lines = Vec::new();

        // Header: "Receipt 5f60b5a6... (status 2)"
        let id = if details.id.is_empty() {
            "(no id)"
        } else {
            details.id.as_str()
        };
        lines.push(format!(
            "{} {} {}",
            self.bold("Receipt"),
            self.cyan(id),
            self.dim(&format!("(status {})", details.status))
        ));

        lines.push(format!(
            "  Sum:    {}",
            self.green(&format!("{} RUB", details.operation.sum_display()))
        ));

        if !details.operation.date.is_empty() {
            lines.push(format!("  Date:   {}", details.operation.date));
        }
        lines.push(format!(
            "  Type:   {}",
            operation_label(details.operation.kind)
        ));
        if !details.seller.inn.is_empty() {
            lines.push(format!("  Seller: INN {}", details.seller.inn));
        }

        lines.join("\n")
    }

    /// Formats a decoded QR payload.
    pub fn format_payload(&self, payload: &QrPayload) -> String {
        let mut lines = vec![self.dim(payload.as_str())];

        match payload.timestamp() {
            Some(t) => lines.push(format!("  Time:     {}", t.format("%Y-%m-%d %H:%M"))),
            None => lines.push(format!("  Time:     {}", self.yellow("unknown"))),
        }
        if let Some(sum) = payload.field("s") {
            lines.push(format!("  Sum:      {}", self.green(&format!("{sum} RUB"))));
        }
        if let Some(fd) = payload.fiscal_drive() {
            lines.push(format!("  FN:       {fd}"));
        }
        if let Some(doc) = payload.fiscal_document() {
            lines.push(format!("  Document: {doc}"));
        }
        if let Some(sign) = payload.fiscal_sign() {
            lines.push(format!("  Sign:     {sign}"));
        }

        lines.join("\n")
    }

    // ========================================================================
    // Color helpers
    // ========================================================================

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_colors {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }
}

/// Human label for an operation type code.
pub(crate) fn operation_label(kind: i64) -> &'static str {
    match kind {
        1 => "sale",
        2 => "sale return",
        3 => "purchase",
        4 => "purchase return",
        _ => "unknown",
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_labels() {
        assert_eq!(operation_label(1), "sale");
        assert_eq!(operation_label(2), "sale return");
        assert_eq!(operation_label(0), "unknown");
    }

    #[test]
    fn test_paint_respects_color_flag() {
        assert_eq!(TextFormatter::new(false).green("x"), "x");
        assert_eq!(TextFormatter::new(true).green("x"), format!("{GREEN}x{RESET}"));
    }
}
