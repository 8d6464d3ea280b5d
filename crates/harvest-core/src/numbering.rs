//! # Invoice Numbering Policy
//!
//! Pure rules behind the invoice number allocator.
//!
//! ```text
//! prefix "INV", counter 7   ──►   "INV-0007"
//! prefix "FARM", counter 12345 ──► "FARM-12345"   (pad is a minimum width)
//! ```
//!
//! Storage of the counter and of the reuse queue lives in harvest-db.

use chrono::{DateTime, Duration, Utc};

/// Prefix given to accounts that never configured one.
pub const DEFAULT_INVOICE_PREFIX: &str = "INV";

/// Days between invoice date and due date. Fixed, not configurable per call.
pub const INVOICE_DUE_DAYS: i64 = 30;

/// Default payment terms text for new accounts.
pub const DEFAULT_PAYMENT_TERMS: &str = "Net 30";

/// Minimum digits of the numeric part.
pub const NUMBER_WIDTH: usize = 4;

/// Formats `prefix-NNNN`.
///
/// ```rust
/// use harvest_core::numbering::format_invoice_number;
///
/// assert_eq!(format_invoice_number("INV", 1), "INV-0001");
/// assert_eq!(format_invoice_number("INV", 10000), "INV-10000");
/// ```
pub fn format_invoice_number(prefix: &str, counter: i64) -> String {
    format!("{}-{:0width$}", prefix, counter, width = NUMBER_WIDTH)
}

/// True when `number` is the last one minted from a counter now at `next_counter`.
///
/// Deleting such an invoice rewinds the counter instead of queueing the
/// number; queueing it as well would let it be issued twice.
pub fn is_most_recent(number: &str, prefix: &str, next_counter: i64) -> bool {
    next_counter > 1 && number == format_invoice_number(prefix, next_counter - 1)
}

/// Numeric part of a number minted under `prefix`.
pub fn parse_counter(number: &str, prefix: &str) -> Option<i64> {
    let digits = number.strip_prefix(prefix)?.strip_prefix('-')?;
    if digits.len() < NUMBER_WIDTH || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Due date for an invoice dated `invoice_date`.
pub fn due_date(invoice_date: DateTime<Utc>) -> DateTime<Utc> {
    invoice_date + Duration::days(INVOICE_DUE_DAYS)
}
