//! # harvest-db: Database Layer for Harvest Ledger
//!
//! SQLite storage plus the three ledger components that keep sales, stock
//! and invoices consistent: the stock ledger, the invoice number allocator
//! and the sale group manager.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Harvest Ledger Data Flow                           │
//! │                                                                         │
//! │  HTTP handler (POST /sales)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    harvest-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌──────────────┐    │   │
//! │  │   │   Database    │   │    ledger      │   │  Migrations  │    │   │
//! │  │   │   (pool.rs)   │   │ orders         │   │  (embedded)  │    │   │
//! │  │   │               │──►│ invoices       │   │              │    │   │
//! │  │   │ SqlitePool    │   │ stock          │   │ 001_init.sql │    │   │
//! │  │   │               │   │ allocator      │   │              │    │   │
//! │  │   └───────────────┘   └───────┬────────┘   └──────────────┘    │   │
//! │  │                               ▼                                 │   │
//! │  │                       ┌────────────────┐                        │   │
//! │  │                       │  repository    │  one module per table  │   │
//! │  │                       └────────────────┘                        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and workflow error types
//! - [`repository`] - Per-table queries
//! - [`ledger`] - Transactional workflows
//!
//! ## Usage
//!
//! ```rust,ignore
//! use harvest_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/harvest.db")).await?;
//! let actor = db.accounts().resolve("alice").await?;
//!
//! let order = db.orders().create_order(&actor, new_order).await?;
//! let invoice = db.orders().generate_invoice(&actor, &order.sales[0].id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult, LedgerError, LedgerResult};
pub use ledger::{
    InvoiceDesk, InvoiceNumberAllocator, LedgerConfig, SaleGroupManager, StockLedger,
};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::{
    AccountRepository, CustomerRepository, InvoiceRepository, ProductRepository, SaleRepository,
    SettingsRepository,
};
