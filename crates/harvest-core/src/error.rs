//! # Error Types
//!
//! Domain-specific error types for harvest-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  harvest-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Per-field input failures                       │
//! │                                                                         │
//! │  harvest-db errors (separate crate)                                    │
//! │  ├── DbError          - Storage failures                               │
//! │  └── LedgerError      - CoreError | DbError from ledger workflows      │
//! │                                                                         │
//! │  harvest-api errors (app)                                              │
//! │  └── ApiError         - What the HTTP caller sees (code + message)     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → LedgerError → ApiError → Client   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant carries enough context (product, invoice number, field) for
//! the UI to explain why a mutation was rejected.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations and domain lookups that failed.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product id does not resolve.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Customer id does not resolve.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Sale id does not resolve (or belongs to another account).
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Invoice id does not resolve (or belongs to another account).
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    /// Insufficient stock to complete a sale line.
    ///
    /// ## User Workflow
    /// ```text
    /// Order line: P1 × 5
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Sweet Corn (CORN-01)", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// UI shows: "Only 3 Sweet Corn (CORN-01) in stock"
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        product: String,
        available: i64,
        requested: i64,
    },

    /// The order still has invoice(s) and cannot be deleted implicitly.
    #[error("Order {sale_id} has invoice(s) {}; delete them first", .invoice_numbers.join(", "))]
    OrderInvoiced {
        sale_id: String,
        invoice_numbers: Vec<String>,
    },

    /// An invoice already references a member of the order.
    #[error("Order {sale_id} is already invoiced as {invoice_number}")]
    AlreadyInvoiced {
        sale_id: String,
        invoice_number: String,
    },

    /// The order group has no member rows left.
    #[error("Order {0} has no remaining sales")]
    OrderDissolved(String),

    /// Invoice status change that the workflow does not allow.
    #[error("Invoice {invoice_number} cannot move from {from} to {to}")]
    InvalidInvoiceTransition {
        invoice_number: String,
        from: String,
        to: String,
    },

    /// Actor is neither the owner nor a member of the owner's account.
    #[error("Identity {identity} may not modify {resource}")]
    Forbidden { identity: String, resource: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Returns true for errors that mean "this id does not resolve".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::ProductNotFound(_)
                | CoreError::CustomerNotFound(_)
                | CoreError::SaleNotFound(_)
                | CoreError::InvoiceNotFound(_)
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any storage write. Every variant names the offending field.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, unknown status).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Change that the requested edit path does not support.
    #[error("{field} cannot be changed here: {reason}")]
    Immutable { field: String, reason: String },
}

impl ValidationError {
    /// Name of the field the error refers to.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. }
            | ValidationError::Immutable { field, .. } => field,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
