//! # Repository Module
//!
//! Database repository implementations for Harvest Ledger.
//!
//! ## Two Layers Per Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  HTTP handler / seed binary                                            │
//! │       │  db.products().get_by_id(id)                                   │
//! │       ▼                                                                 │
//! │  ProductRepository { pool }      ← standalone reads and plain CRUD     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  product::fetch(&mut conn, id)   ← connection-level functions          │
//! │       ▲                                                                 │
//! │       │  same functions, inside one transaction                        │
//! │  ledger::orders / ledger::invoices                                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`] - Catalog and guarded stock updates
//! - [`CustomerRepository`] - Customers
//! - [`SaleRepository`] - Sale rows, legacy group tag backfill
//! - [`InvoiceRepository`] - Invoices and items
//! - [`SettingsRepository`] - Business settings, reusable number queue
//! - [`AccountRepository`] - Identity → account membership

pub mod account;
pub mod customer;
pub mod invoice;
pub mod product;
pub mod sale;
pub mod settings;

pub use account::AccountRepository;
pub use customer::CustomerRepository;
pub use invoice::InvoiceRepository;
pub use product::ProductRepository;
pub use sale::SaleRepository;
pub use settings::SettingsRepository;
