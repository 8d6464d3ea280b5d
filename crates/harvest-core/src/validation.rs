//! # Validation Module
//!
//! Input validation for Harvest Ledger.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Frontend (React forms)                                       │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: HTTP handler (harvest-api)                                   │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: field rules, run before any storage write            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Ledger workflows (harvest-db)                                │
//! │  └── Stock availability, invoice state guards                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: Database (SQLite)                                            │
//! │  ├── CHECK (stock >= 0)                                                │
//! │  ├── UNIQUE (sku), UNIQUE (user_id, invoice_number)                    │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use harvest_core::validation::{validate_sku, validate_quantity};
//!
//! assert!(validate_sku("CORN-01").is_ok());
//! assert!(validate_quantity(5).is_ok());
//! ```

use crate::error::ValidationError;
use crate::types::OrderLine;
use crate::{MAX_AMOUNT_CENTS, MAX_LINE_QUANTITY, MAX_NOTES_LENGTH, MAX_ORDER_LINES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only alphanumeric characters, hyphens, underscores
///
/// ```rust
/// use harvest_core::validation::validate_sku;
///
/// assert!(validate_sku("EGGS-DOZEN").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("A".repeat(100).as_str()).is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name: non-empty, at most 200 characters.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates an invoice prefix.
///
/// ## Rules
/// - 1 to 10 characters
/// - Letters and digits only; the `-` separator is added when formatting
pub fn validate_invoice_prefix(prefix: &str) -> ValidationResult<()> {
    if prefix.is_empty() {
        return Err(ValidationError::Required {
            field: "invoicePrefix".to_string(),
        });
    }

    if prefix.len() > 10 {
        return Err(ValidationError::TooLong {
            field: "invoicePrefix".to_string(),
            max: 10,
        });
    }

    if !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat {
            field: "invoicePrefix".to_string(),
            reason: "must contain only letters and digits".to_string(),
        });
    }

    Ok(())
}

/// Validates free-text notes. Empty is fine.
pub fn validate_notes(notes: Option<&str>) -> ValidationResult<()> {
    match notes {
        Some(text) if text.chars().count() > MAX_NOTES_LENGTH => Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: MAX_NOTES_LENGTH,
        }),
        _ => Ok(()),
    }
}

/// Validates the sales channel label ("market stall", "website", ...).
pub fn validate_platform_source(source: Option<&str>) -> ValidationResult<()> {
    match source {
        Some(text) if text.chars().count() > 100 => Err(ValidationError::TooLong {
            field: "platformSource".to_string(),
            max: 100,
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY
///
/// ## User Workflow
/// ```text
/// Order form: P1 × 0
///      │
///      ▼
/// validate_quantity(0) ← THIS FUNCTION
///      │
///      ├── qty <= 0? → "quantity must be positive"
///      ├── qty too large? → "quantity must be between 1 and ..."
///      └── OK → stock availability check
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates an amount in cents: `0..=MAX_AMOUNT_CENTS`.
///
/// ```rust
/// use harvest_core::validation::validate_amount_cents;
///
/// assert!(validate_amount_cents("unitPrice", 1099).is_ok());
/// assert!(validate_amount_cents("unitPrice", 0).is_ok());
/// assert!(validate_amount_cents("unitPrice", -100).is_err());
/// assert!(validate_amount_cents("unitPrice", 4_000_000_000_000_000_000).is_err());
/// ```
pub fn validate_amount_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_AMOUNT_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

/// Per-unit discount must satisfy `0 <= discount <= unit price`.
pub fn validate_discount(discount_cents: i64, unit_price_cents: i64) -> ValidationResult<()> {
    if discount_cents < 0 || discount_cents > unit_price_cents {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: unit_price_cents.max(0),
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: i64) -> ValidationResult<()> {
    if !(0..=10_000).contains(&bps) {
        return Err(ValidationError::OutOfRange {
            field: "taxRate".to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

// =============================================================================
// Order Validators
// =============================================================================

/// Validates one order line in isolation. Stock is checked later, in storage.
pub fn validate_order_line(line: &OrderLine) -> ValidationResult<()> {
    validate_uuid("productId", &line.product_id)?;
    validate_quantity(line.quantity)?;
    validate_amount_cents("unitPrice", line.unit_price_cents)?;
    validate_discount(line.discount_cents, line.unit_price_cents)?;
    Ok(())
}

/// Validates a submitted order: 1..=MAX_ORDER_LINES valid lines.
pub fn validate_order_lines(lines: &[OrderLine]) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::Required {
            field: "lines".to_string(),
        });
    }

    if lines.len() > MAX_ORDER_LINES {
        return Err(ValidationError::OutOfRange {
            field: "lines".to_string(),
            min: 1,
            max: MAX_ORDER_LINES as i64,
        });
    }

    lines.iter().try_for_each(validate_order_line)
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates that `id` is a UUID, reporting failures against `field`.
///
/// ```rust
/// use harvest_core::validation::validate_uuid;
///
/// assert!(validate_uuid("saleId", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("saleId", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
