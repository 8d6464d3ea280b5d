//! # harvest-core: Pure Business Logic for Harvest Ledger
//!
//! This crate holds the rules of the sales and invoicing core as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Harvest Ledger Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Frontend (React)                             │   │
//! │  │   Order form ──► Sales list ──► Invoice preview ──► PDF         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP / JSON                            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    harvest-api (axum)                           │   │
//! │  │   /sales, /invoices, identity → account resolution              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               harvest-db (storage + ledger workflows)           │   │
//! │  │   Stock Ledger • Invoice Number Allocator • Sale Group Manager  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ uses                                   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ harvest-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   types • money • pricing • group • numbering • order           │   │
//! │  │   validation • error                                            │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Product, Sale, Invoice, BusinessSettings, ...)
//! - [`money`] - Integer-cents money type
//! - [`pricing`] - Derived line totals and profit
//! - [`group`] - Order group ids and the legacy notes tag
//! - [`numbering`] - Invoice number format and due-date policy
//! - [`order`] - Order lifecycle (`Active`, `Invoiced`, `Dissolved`) and guards
//! - [`validation`] - Field rules checked before any write
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use harvest_core::numbering::format_invoice_number;
//! use harvest_core::pricing::price_line;
//!
//! let line = price_line(3, 1000, 0, 600);
//! assert_eq!(line.total.to_string(), "30.00");
//! assert_eq!(format_invoice_number("INV", 1), "INV-0001");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod group;
pub mod money;
pub mod numbering;
pub mod order;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use order::{InvoiceRef, OrderState, SaleGroup};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Stock level at or below which a decrement reports a low-stock warning.
///
/// Default only; deployments override it through `[ledger] low_stock_threshold`.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;

/// Maximum product lines in one order.
pub const MAX_ORDER_LINES: usize = 50;

/// Maximum quantity on a single line. Farm orders run to pallets, not cases.
pub const MAX_LINE_QUANTITY: i64 = 100_000;

/// Maximum unit price, cost price or stock figure accepted from input (100M in
/// currency units). Keeps `price × MAX_LINE_QUANTITY` well inside `i64`.
pub const MAX_AMOUNT_CENTS: i64 = 10_000_000_000;

/// Maximum length of the free-text notes field.
pub const MAX_NOTES_LENGTH: usize = 1_000;
