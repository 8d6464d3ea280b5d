//! # Invoice Number Allocator
//!
//! Hands out invoice numbers per business account, reusing freed numbers
//! before minting new ones.
//!
//! ## Allocation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  allocate_number(account)                                              │
//! │       │                                                                 │
//! │       ├── reuse queue non-empty? ──► pop OLDEST ("INV-0002")           │
//! │       │                                                                 │
//! │       └── else claim counter      ──► "INV-0007", counter 7 → 8        │
//! │                                                                         │
//! │  reclaim(account, "INV-0007") after deleting an invoice                │
//! │       │                                                                 │
//! │       ├── it is counter − 1 (most recent) ──► counter 8 → 7   Rewound  │
//! │       └── otherwise                       ──► push to queue   Queued   │
//! │                                                                         │
//! │  reset_if_empty(account): no invoices left → counter = 1, queue = ∅    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Identities sharing an account share one counter and one queue: every
//! function here takes the account id, never the identity.

use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::ledger::{begin_write, LedgerConfig};
use crate::repository::{invoice, settings};
use harvest_core::numbering::{format_invoice_number, is_most_recent, DEFAULT_PAYMENT_TERMS};
use harvest_core::BusinessSettings;

/// What happened to a number freed by an invoice deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reclaimed {
    /// The counter stepped back; the number will be minted again.
    Rewound,
    /// The number joined the reuse queue.
    Queued,
}

/// Returns the account's settings, creating the default row on first use.
pub async fn ensure_settings(
    conn: &mut SqliteConnection,
    account_id: &str,
    config: &LedgerConfig,
) -> DbResult<BusinessSettings> {
    if let Some(existing) = settings::fetch(conn, account_id).await? {
        return Ok(existing);
    }

    let defaults = settings::SettingsDefaults {
        invoice_prefix: &config.default_invoice_prefix,
        currency: &config.default_currency,
        payment_terms: DEFAULT_PAYMENT_TERMS,
    };
    if settings::insert_default(conn, account_id, &defaults, chrono::Utc::now()).await? {
        info!(account_id = %account_id, prefix = %config.default_invoice_prefix, "Provisioned business settings");
    }

    settings::fetch(conn, account_id)
        .await?
        .ok_or_else(|| DbError::not_found("Settings", account_id))
}

/// The number the next allocation would return, without consuming it.
pub async fn peek_next_number(
    conn: &mut SqliteConnection,
    account_id: &str,
    config: &LedgerConfig,
) -> DbResult<String> {
    let settings = ensure_settings(conn, account_id, config).await?;

    if let Some(reusable) = settings::peek_reusable(conn, account_id).await? {
        return Ok(reusable);
    }

    Ok(format_invoice_number(
        &settings.invoice_prefix,
        settings.next_invoice_number,
    ))
}

/// Consumes the next number: oldest reusable one, else a freshly minted one.
pub async fn allocate_number(
    conn: &mut SqliteConnection,
    account_id: &str,
    config: &LedgerConfig,
) -> DbResult<String> {
    ensure_settings(conn, account_id, config).await?;

    if let Some(reused) = settings::pop_reusable(conn, account_id).await? {
        info!(account_id = %account_id, number = %reused, "Reusing invoice number");
        return Ok(reused);
    }

    let (prefix, claimed) = settings::claim_counter(conn, account_id)
        .await?
        .ok_or_else(|| DbError::not_found("Settings", account_id))?;

    let number = format_invoice_number(&prefix, claimed);
    info!(account_id = %account_id, number = %number, "Minted invoice number");
    Ok(number)
}

/// Puts a number on the reuse queue.
///
/// Callers deleting an invoice go through [`reclaim`], which only queues
/// numbers that are not the most recently minted one.
pub async fn release_number(conn: &mut SqliteConnection, account_id: &str, number: &str) -> DbResult<()> {
    settings::push_reusable(conn, account_id, number).await
}

/// Returns a deleted invoice's number to circulation.
pub async fn reclaim(conn: &mut SqliteConnection, account_id: &str, number: &str) -> DbResult<Reclaimed> {
    let current = settings::fetch(conn, account_id).await?;

    if let Some(current) = current {
        if is_most_recent(number, &current.invoice_prefix, current.next_invoice_number)
            && settings::rewind_counter(conn, account_id).await? == 1
        {
            info!(account_id = %account_id, number = %number, "Rewound invoice counter");
            return Ok(Reclaimed::Rewound);
        }
    }

    release_number(conn, account_id, number).await?;
    Ok(Reclaimed::Queued)
}

/// Resets numbering when the account has no invoices left.
///
/// Returns true when the reset happened.
pub async fn reset_if_empty(conn: &mut SqliteConnection, account_id: &str) -> DbResult<bool> {
    if invoice::count_for_account(conn, account_id).await? > 0 {
        return Ok(false);
    }

    settings::reset_counter(conn, account_id).await?;
    let dropped = settings::clear_reusable(conn, account_id).await?;
    info!(account_id = %account_id, dropped, "No invoices left, numbering reset");
    Ok(true)
}

// =============================================================================
// Standalone handle
// =============================================================================

/// Pool-backed allocator; each call runs in its own transaction.
#[derive(Debug, Clone)]
pub struct InvoiceNumberAllocator {
    pool: SqlitePool,
    config: LedgerConfig,
}

impl InvoiceNumberAllocator {
    pub fn new(pool: SqlitePool, config: LedgerConfig) -> Self {
        InvoiceNumberAllocator { pool, config }
    }

    pub async fn peek_next_number(&self, account_id: &str) -> DbResult<String> {
        let mut tx = begin_write(&self.pool).await?;
        let number = peek_next_number(&mut tx, account_id, &self.config).await?;
        tx.commit().await?;
        Ok(number)
    }

    pub async fn allocate_number(&self, account_id: &str) -> DbResult<String> {
        let mut tx = begin_write(&self.pool).await?;
        let number = allocate_number(&mut tx, account_id, &self.config).await?;
        tx.commit().await?;
        Ok(number)
    }

    pub async fn release_number(&self, account_id: &str, number: &str) -> DbResult<()> {
        let mut tx = begin_write(&self.pool).await?;
        release_number(&mut tx, account_id, number).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn reclaim(&self, account_id: &str, number: &str) -> DbResult<Reclaimed> {
        let mut tx = begin_write(&self.pool).await?;
        let reclaimed = reclaim(&mut tx, account_id, number).await?;
        tx.commit().await?;
        Ok(reclaimed)
    }

    pub async fn reset_if_empty(&self, account_id: &str) -> DbResult<bool> {
        let mut tx = begin_write(&self.pool).await?;
        let reset = reset_if_empty(&mut tx, account_id).await?;
        tx.commit().await?;
        Ok(reset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use std::collections::HashSet;

    async fn allocator() -> (Database, InvoiceNumberAllocator) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let allocator = db.numbering();
        (db, allocator)
    }

    #[tokio::test]
    async fn test_first_use_provisions_defaults() {
        let (db, allocator) = allocator().await;

        assert_eq!(allocator.peek_next_number("farm-1").await.unwrap(), "INV-0001");

        let settings = db.settings().get("farm-1").await.unwrap().unwrap();
        assert_eq!(settings.invoice_prefix, "INV");
        assert_eq!(settings.next_invoice_number, 1);
        assert_eq!(settings.payment_terms, "Net 30");
        assert_eq!(settings.currency, "USD");
        assert_eq!(settings.tax_rate_bps, 0);
    }

    #[tokio::test]
    async fn test_allocations_are_distinct() {
        let (_db, allocator) = allocator().await;

        let numbers: Vec<String> = {
            let mut out = Vec::new();
            for _ in 0..25 {
                out.push(allocator.allocate_number("farm-1").await.unwrap());
            }
            out
        };
        let unique: HashSet<_> = numbers.iter().collect();
        assert_eq!(unique.len(), 25);
        assert_eq!(numbers[0], "INV-0001");
        assert_eq!(numbers[24], "INV-0025");
    }

    #[tokio::test]
    async fn test_peek_does_not_consume() {
        let (_db, allocator) = allocator().await;

        assert_eq!(allocator.peek_next_number("farm-1").await.unwrap(), "INV-0001");
        assert_eq!(allocator.peek_next_number("farm-1").await.unwrap(), "INV-0001");
        assert_eq!(allocator.allocate_number("farm-1").await.unwrap(), "INV-0001");
        assert_eq!(allocator.peek_next_number("farm-1").await.unwrap(), "INV-0002");
    }

    #[tokio::test]
    async fn test_reuse_is_fifo() {
        let (_db, allocator) = allocator().await;
        for _ in 0..5 {
            allocator.allocate_number("farm-1").await.unwrap();
        }

        allocator.release_number("farm-1", "INV-0003").await.unwrap();
        allocator.release_number("farm-1", "INV-0001").await.unwrap();

        assert_eq!(allocator.peek_next_number("farm-1").await.unwrap(), "INV-0003");
        assert_eq!(allocator.allocate_number("farm-1").await.unwrap(), "INV-0003");
        assert_eq!(allocator.allocate_number("farm-1").await.unwrap(), "INV-0001");
        assert_eq!(allocator.allocate_number("farm-1").await.unwrap(), "INV-0006");
    }

    #[tokio::test]
    async fn test_reclaim_rewinds_most_recent_and_queues_others() {
        let (db, allocator) = allocator().await;
        for _ in 0..3 {
            allocator.allocate_number("farm-1").await.unwrap();
        }

        assert_eq!(allocator.reclaim("farm-1", "INV-0003").await.unwrap(), Reclaimed::Rewound);
        assert_eq!(allocator.reclaim("farm-1", "INV-0001").await.unwrap(), Reclaimed::Queued);

        let queue = db.settings().reusable_numbers("farm-1").await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].invoice_number, "INV-0001");

        assert_eq!(allocator.allocate_number("farm-1").await.unwrap(), "INV-0001");
        assert_eq!(allocator.allocate_number("farm-1").await.unwrap(), "INV-0003");
    }

    #[tokio::test]
    async fn test_reset_when_account_has_no_invoices() {
        let (db, allocator) = allocator().await;
        for _ in 0..4 {
            allocator.allocate_number("farm-1").await.unwrap();
        }
        allocator.release_number("farm-1", "INV-0002").await.unwrap();

        assert!(allocator.reset_if_empty("farm-1").await.unwrap());
        assert!(db.settings().reusable_numbers("farm-1").await.unwrap().is_empty());
        assert_eq!(allocator.allocate_number("farm-1").await.unwrap(), "INV-0001");
    }

    #[tokio::test]
    async fn test_accounts_have_separate_counters() {
        let (_db, allocator) = allocator().await;

        allocator.allocate_number("farm-1").await.unwrap();
        allocator.allocate_number("farm-1").await.unwrap();
        assert_eq!(allocator.allocate_number("farm-2").await.unwrap(), "INV-0001");
    }
}
