//! # Sale Repository
//!
//! Database operations for sale rows (order lines).
//!
//! ## Order Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  One logical order = every row sharing (user_id, customer_id, group_id) │
//! │                                                                         │
//! │  rowid  id   product  qty  group_id                                     │
//! │  ─────  ───  ───────  ───  ────────                                     │
//! │   41    s1   P1        3   g-7f…   ◄── anchor (lowest rowid)            │
//! │   42    s2   P2        1   g-7f…                                        │
//! │   43    s3   P3        2   NULL    ◄── single-line order                │
//! │                                                                         │
//! │  Rows of one order are written in one transaction, so rowid order is    │
//! │  insertion order and the anchor survives composition edits.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Connection-level functions are used by `ledger::orders` inside its
//! transactions; [`SaleRepository`] serves standalone reads and the legacy
//! notes-tag backfill.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::DbResult;
use harvest_core::group::{extract_group_id, strip_tags};
use harvest_core::{Sale, SaleStatus};

// =============================================================================
// Connection-level operations (usable inside a transaction)
// =============================================================================

/// Fetches a sale row by id.
pub async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
    let sale = sqlx::query_as::<_, Sale>(
        r#"
        SELECT id, user_id, customer_id, product_id, quantity, unit_price_cents,
               discount_cents, total_cents, profit_cents, status, sale_date,
               platform_source, notes, group_id, created_at, updated_at
        FROM sales
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(sale)
}

/// Every row of one order, anchor first.
pub async fn fetch_group_members(
    conn: &mut SqliteConnection,
    account_id: &str,
    customer_id: &str,
    group_id: &str,
) -> DbResult<Vec<Sale>> {
    let members = sqlx::query_as::<_, Sale>(
        r#"
        SELECT id, user_id, customer_id, product_id, quantity, unit_price_cents,
               discount_cents, total_cents, profit_cents, status, sale_date,
               platform_source, notes, group_id, created_at, updated_at
        FROM sales
        WHERE group_id = ?1 AND customer_id = ?2 AND user_id = ?3
        ORDER BY rowid
        "#,
    )
    .bind(group_id)
    .bind(customer_id)
    .bind(account_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(members)
}

/// Inserts a sale row as given. Amounts must already be priced.
pub async fn insert(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    debug!(id = %sale.id, product_id = %sale.product_id, quantity = sale.quantity, "Inserting sale");

    sqlx::query(
        r#"
        INSERT INTO sales (
            id, user_id, customer_id, product_id, quantity, unit_price_cents,
            discount_cents, total_cents, profit_cents, status, sale_date,
            platform_source, notes, group_id, created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6,
            ?7, ?8, ?9, ?10, ?11,
            ?12, ?13, ?14, ?15, ?16
        )
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.user_id)
    .bind(&sale.customer_id)
    .bind(&sale.product_id)
    .bind(sale.quantity)
    .bind(sale.unit_price_cents)
    .bind(sale.discount_cents)
    .bind(sale.total_cents)
    .bind(sale.profit_cents)
    .bind(sale.status)
    .bind(sale.sale_date)
    .bind(&sale.platform_source)
    .bind(&sale.notes)
    .bind(&sale.group_id)
    .bind(sale.created_at)
    .bind(sale.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Rewrites every mutable column of an existing row. Returns rows affected.
pub async fn update(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<u64> {
    debug!(id = %sale.id, "Updating sale");

    let result = sqlx::query(
        r#"
        UPDATE sales SET
            customer_id = ?2,
            product_id = ?3,
            quantity = ?4,
            unit_price_cents = ?5,
            discount_cents = ?6,
            total_cents = ?7,
            profit_cents = ?8,
            status = ?9,
            sale_date = ?10,
            platform_source = ?11,
            notes = ?12,
            group_id = ?13,
            updated_at = ?14
        WHERE id = ?1
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.customer_id)
    .bind(&sale.product_id)
    .bind(sale.quantity)
    .bind(sale.unit_price_cents)
    .bind(sale.discount_cents)
    .bind(sale.total_cents)
    .bind(sale.profit_cents)
    .bind(sale.status)
    .bind(sale.sale_date)
    .bind(&sale.platform_source)
    .bind(&sale.notes)
    .bind(&sale.group_id)
    .bind(sale.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

/// Order-level fields shared by every row of one order.
#[derive(Debug, Clone)]
pub struct SaleHeader<'a> {
    pub status: SaleStatus,
    pub sale_date: DateTime<Utc>,
    pub platform_source: Option<&'a str>,
    pub notes: Option<&'a str>,
}

/// Updates the order-level fields of one row without touching its line.
pub async fn update_header(
    conn: &mut SqliteConnection,
    id: &str,
    header: &SaleHeader<'_>,
) -> DbResult<u64> {
    let result = sqlx::query(
        r#"
        UPDATE sales SET
            status = ?2,
            sale_date = ?3,
            platform_source = ?4,
            notes = ?5,
            updated_at = ?6
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(header.status)
    .bind(header.sale_date)
    .bind(header.platform_source)
    .bind(header.notes)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

/// Deletes one row. Returns rows affected.
pub async fn delete(conn: &mut SqliteConnection, id: &str) -> DbResult<u64> {
    debug!(id = %id, "Deleting sale");

    let result = sqlx::query("DELETE FROM sales WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    /// Lists an account's sale rows, newest sale date first.
    pub async fn list(&self, account_id: &str, limit: u32) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, user_id, customer_id, product_id, quantity, unit_price_cents,
                   discount_cents, total_cents, profit_cents, status, sale_date,
                   platform_source, notes, group_id, created_at, updated_at
            FROM sales
            WHERE user_id = ?1
            ORDER BY sale_date DESC, rowid DESC
            LIMIT ?2
            "#,
        )
        .bind(account_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Moves legacy `[GROUP:<id>]` notes tags into the `group_id` column.
    ///
    /// ## What This Does
    /// ```text
    /// before: notes = "gate code 41 [GROUP:g1]", group_id = NULL
    /// after:  notes = "gate code 41",            group_id = "g1"
    /// ```
    ///
    /// Rows that already have a `group_id` are left alone. Idempotent.
    ///
    /// ## Returns
    /// Number of rows migrated.
    pub async fn backfill_legacy_group_tags(&self) -> DbResult<u64> {
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let tagged: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT id, notes
            FROM sales
            WHERE group_id IS NULL AND notes LIKE '%[GROUP:%'
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        let mut migrated = 0;
        for (id, notes) in tagged {
            let Some(group_id) = extract_group_id(&notes) else {
                continue;
            };

            sqlx::query("UPDATE sales SET group_id = ?2, notes = ?3 WHERE id = ?1")
                .bind(&id)
                .bind(group_id)
                .bind(strip_tags(&notes))
                .execute(&mut *tx)
                .await?;
            migrated += 1;
        }

        tx.commit().await?;

        if migrated > 0 {
            info!(migrated, "Backfilled legacy group tags");
        }
        Ok(migrated)
    }
}
