//! # Ledger Workflows
//!
//! The three cooperating components that keep sales, stock and invoices
//! consistent.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   HTTP handler                                                          │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   ┌────────────────────────┐        ┌─────────────────────────┐        │
//! │   │  orders (Sale Group    │───────►│  stock (Stock Ledger)   │        │
//! │   │  Manager)              │        │  is_available / adjust  │        │
//! │   │  create / edit /       │        └─────────────────────────┘        │
//! │   │  delete / invoice      │        ┌─────────────────────────┐        │
//! │   │                        │───────►│  allocator (Invoice     │        │
//! │   └────────────────────────┘        │  Number Allocator)      │        │
//! │   ┌────────────────────────┐        │  peek / allocate /      │        │
//! │   │  invoices (desk)       │───────►│  release / reset        │        │
//! │   │  preview / delete /    │        └─────────────────────────┘        │
//! │   │  status                │                                           │
//! │   └────────────────────────┘                                           │
//! │                                                                         │
//! │   Every public workflow runs in ONE SQLite transaction. A failure at   │
//! │   any step rolls back every stock move and invoice change before it.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Workflows receive an already-resolved [`Actor`]; the account check runs
//! before the first write.

pub mod allocator;
pub mod invoices;
pub mod orders;
pub mod stock;

use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::DbResult;
use harvest_core::numbering::DEFAULT_INVOICE_PREFIX;
use harvest_core::{Actor, CoreError, DEFAULT_LOW_STOCK_THRESHOLD};

pub use allocator::{InvoiceNumberAllocator, Reclaimed};
pub use invoices::{InvoiceDeletion, InvoiceDesk};
pub use orders::{
    NewOrder, OrderDeletion, OrderEdit, OrderOutcome, OrderView, SaleEdit, SaleEditOutcome,
    SaleGroupManager, StatusUpdate,
};
pub use stock::{StockAdjustment, StockLedger};

/// Tunables shared by the ledger workflows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Decrements leaving stock at or below this report a warning.
    pub low_stock_threshold: i64,
    /// Prefix given to accounts provisioned on first invoice.
    pub default_invoice_prefix: String,
    /// Currency given to accounts provisioned on first invoice.
    pub default_currency: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            default_invoice_prefix: DEFAULT_INVOICE_PREFIX.to_string(),
            default_currency: "USD".to_string(),
        }
    }
}

impl LedgerConfig {
    pub fn low_stock_threshold(mut self, threshold: i64) -> Self {
        self.low_stock_threshold = threshold;
        self
    }
}

/// Opens a workflow transaction holding the database write lock from the start.
///
/// A deferred transaction that reads first and writes later cannot wait for
/// a concurrent writer: SQLite fails the upgrade with `SQLITE_BUSY` at once.
/// `BEGIN IMMEDIATE` takes the lock up front, so concurrent workflows queue on
/// the busy timeout instead.
pub(crate) async fn begin_write(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

/// Rejects actors acting outside their account.
pub(crate) fn authorize(actor: &Actor, owner_account: &str, resource: &str) -> Result<(), CoreError> {
    if actor.can_modify(owner_account) {
        Ok(())
    } else {
        tracing::warn!(
            identity = %actor.identity_id,
            account = %actor.account_id,
            resource = %resource,
            "Rejected cross-account access"
        );
        Err(CoreError::Forbidden {
            identity: actor.identity_id.clone(),
            resource: resource.to_string(),
        })
    }
}

/// Shared fixtures for ledger tests.
#[cfg(test)]
pub(crate) mod testing {
    use crate::pool::{Database, DbConfig};
    use crate::repository::product::NewProduct;
    use harvest_core::{Actor, Customer, Product};

    pub const ACCOUNT: &str = "farm-1";

    pub struct Fixture {
        pub db: Database,
        pub actor: Actor,
        pub customer: Customer,
        pub p1: Product,
        pub p2: Product,
    }

    /// P1 @ 10.00 (cost 6.00, stock 20), P2 @ 5.00 (cost 2.00, stock 12), customer C.
    pub async fn fixture() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let p1 = db
            .products()
            .create(
                ACCOUNT,
                &NewProduct {
                    sku: "CORN-01".into(),
                    name: "Sweet Corn".into(),
                    cost_price_cents: 600,
                    selling_price_cents: 1000,
                    stock: 20,
                },
            )
            .await
            .unwrap();
        let p2 = db
            .products()
            .create(
                ACCOUNT,
                &NewProduct {
                    sku: "HONEY-500".into(),
                    name: "Wildflower Honey".into(),
                    cost_price_cents: 200,
                    selling_price_cents: 500,
                    stock: 12,
                },
            )
            .await
            .unwrap();
        let customer = db
            .customers()
            .create(ACCOUNT, "Greenway Grocers", Some("orders@greenway.test"), None)
            .await
            .unwrap();

        Fixture {
            db,
            actor: Actor::owner(ACCOUNT),
            customer,
            p1,
            p2,
        }
    }

    impl Fixture {
        pub async fn stock(&self, product: &Product) -> i64 {
            self.db
                .products()
                .get_by_id(&product.id)
                .await
                .unwrap()
                .unwrap()
                .stock
        }
    }
}
