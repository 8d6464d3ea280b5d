//! # Stock Ledger
//!
//! Moves a product's on-hand quantity and answers availability questions.
//!
//! ## Two Guards
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  1. check_availability(all lines)      ← before ANY write              │
//! │       P1: need 3, have 20 ✓                                             │
//! │       P2: need 9, have 4  ✗ → InsufficientStock, nothing written       │
//! │                                                                         │
//! │  2. adjust(P, Δ)                       ← every write                   │
//! │       UPDATE … SET stock = stock + Δ WHERE stock + Δ >= 0               │
//! │       catches a concurrent sale that slipped in after check 1           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Low stock is advisory: a decrement that leaves stock at or below the
//! configured threshold returns a [`StockWarning`] but never fails.

use std::collections::BTreeMap;

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbResult, LedgerResult};
use crate::ledger::begin_write;
use crate::repository::product;
use harvest_core::{CoreError, Product, StockWarning};

/// Result of a standalone adjustment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockAdjustment {
    pub product_id: String,
    pub stock: i64,
    pub warning: Option<StockWarning>,
}

/// Warning for `product` if `remaining` is at or below `threshold`.
pub fn low_stock_warning(product: &Product, remaining: i64, threshold: i64) -> Option<StockWarning> {
    (remaining <= threshold).then(|| StockWarning {
        product_id: product.id.clone(),
        sku: product.sku.clone(),
        name: product.name.clone(),
        remaining,
        threshold,
    })
}

/// True iff the product exists and has at least `required` on hand.
pub async fn is_available(conn: &mut SqliteConnection, product_id: &str, required: i64) -> DbResult<bool> {
    let stock = product::stock_of(conn, product_id).await?;
    Ok(stock.is_some_and(|stock| stock >= required))
}

/// Atomically applies `delta` to stock. Returns the new stock.
///
/// ## Errors
/// * `ProductNotFound` - unknown product
/// * `InsufficientStock` - the change would drive stock negative
pub async fn adjust(conn: &mut SqliteConnection, product_id: &str, delta: i64) -> LedgerResult<i64> {
    if let Some(stock) = product::add_stock(conn, product_id, delta).await? {
        return Ok(stock);
    }

    match product::fetch(conn, product_id).await? {
        None => Err(CoreError::ProductNotFound(product_id.to_string()).into()),
        Some(current) => Err(CoreError::InsufficientStock {
            product_id: current.id.clone(),
            product: current.label(),
            available: current.stock,
            requested: -delta,
        }
        .into()),
    }
}

/// Takes `quantity` off the shelf and reports low stock.
pub async fn decrement(
    conn: &mut SqliteConnection,
    product: &Product,
    quantity: i64,
    threshold: i64,
) -> LedgerResult<Option<StockWarning>> {
    let remaining = adjust(conn, &product.id, -quantity).await?;
    let warning = low_stock_warning(product, remaining, threshold);
    if let Some(w) = &warning {
        warn!(sku = %w.sku, remaining = w.remaining, "Low stock");
    }
    Ok(warning)
}

/// Puts `quantity` back on the shelf.
pub async fn restore(conn: &mut SqliteConnection, product_id: &str, quantity: i64) -> LedgerResult<i64> {
    adjust(conn, product_id, quantity).await
}

/// Validates a whole order against stock before anything is written.
///
/// `returned` is stock the same workflow is about to put back (the rows an
/// edit replaces) and counts as available.
///
/// Returns every requested product, keyed by id, for pricing.
pub async fn check_availability(
    conn: &mut SqliteConnection,
    account_id: &str,
    requested: &BTreeMap<String, i64>,
    returned: &BTreeMap<String, i64>,
) -> LedgerResult<BTreeMap<String, Product>> {
    let mut products = BTreeMap::new();

    for (product_id, &quantity) in requested {
        let product = product::fetch(conn, product_id)
            .await?
            .filter(|p| p.user_id == account_id)
            .ok_or_else(|| CoreError::ProductNotFound(product_id.clone()))?;

        let available = product.stock + returned.get(product_id).copied().unwrap_or(0);
        if available < quantity {
            debug!(sku = %product.sku, available, quantity, "Order exceeds stock");
            return Err(CoreError::InsufficientStock {
                product_id: product.id.clone(),
                product: product.label(),
                available,
                requested: quantity,
            }
            .into());
        }

        products.insert(product_id.clone(), product);
    }

    Ok(products)
}

// =============================================================================
// Standalone handle
// =============================================================================

/// Pool-backed stock operations outside an order workflow (restocks, checks).
#[derive(Debug, Clone)]
pub struct StockLedger {
    pool: SqlitePool,
    threshold: i64,
}

impl StockLedger {
    pub fn new(pool: SqlitePool, threshold: i64) -> Self {
        StockLedger { pool, threshold }
    }

    pub async fn is_available(&self, product_id: &str, required: i64) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        is_available(&mut conn, product_id, required).await
    }

    /// Applies `delta` in its own transaction.
    pub async fn adjust(&self, product_id: &str, delta: i64) -> LedgerResult<StockAdjustment> {
        let mut tx = begin_write(&self.pool).await?;

        let stock = adjust(&mut tx, product_id, delta).await?;
        let warning = if delta < 0 {
            product::fetch(&mut tx, product_id)
                .await?
                .and_then(|p| low_stock_warning(&p, stock, self.threshold))
        } else {
            None
        };

        tx.commit().await?;

        Ok(StockAdjustment {
            product_id: product_id.to_string(),
            stock,
            warning,
        })
    }
}
