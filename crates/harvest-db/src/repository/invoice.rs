//! # Invoice Repository
//!
//! Database operations for invoices and invoice items.
//!
//! Items are never edited in place: whenever the underlying order changes,
//! the ledger deletes every item of the invoice and writes a fresh set.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use harvest_core::{Invoice, InvoiceItem, InvoiceRef, InvoiceStatus};

// =============================================================================
// Connection-level operations (usable inside a transaction)
// =============================================================================

/// Fetches an invoice by id.
pub async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Invoice>> {
    let invoice = sqlx::query_as::<_, Invoice>(
        r#"
        SELECT id, user_id, customer_id, sale_id, invoice_number, invoice_date,
               due_date, status, subtotal_cents, tax_cents, total_cents,
               currency, payment_terms, notes, created_at, updated_at
        FROM invoices
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(invoice)
}

/// Invoices whose `sale_id` is any of `sale_ids`, oldest first.
pub async fn refs_for_sales(
    conn: &mut SqliteConnection,
    sale_ids: &[String],
) -> DbResult<Vec<InvoiceRef>> {
    if sale_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut query: QueryBuilder<'_, Sqlite> =
        QueryBuilder::new("SELECT id, invoice_number, sale_id FROM invoices WHERE sale_id IN (");
    let mut separated = query.separated(", ");
    for id in sale_ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(") ORDER BY rowid");

    let refs = query
        .build_query_as::<InvoiceRef>()
        .fetch_all(&mut *conn)
        .await?;

    Ok(refs)
}

/// Items of an invoice in insertion order.
pub async fn items(conn: &mut SqliteConnection, invoice_id: &str) -> DbResult<Vec<InvoiceItem>> {
    let items = sqlx::query_as::<_, InvoiceItem>(
        r#"
        SELECT id, invoice_id, product_id, quantity, unit_price_cents,
               discount_cents, line_total_cents
        FROM invoice_items
        WHERE invoice_id = ?1
        ORDER BY rowid
        "#,
    )
    .bind(invoice_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

/// Inserts an invoice header.
pub async fn insert(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
    debug!(id = %invoice.id, number = %invoice.invoice_number, "Inserting invoice");

    sqlx::query(
        r#"
        INSERT INTO invoices (
            id, user_id, customer_id, sale_id, invoice_number, invoice_date,
            due_date, status, subtotal_cents, tax_cents, total_cents,
            currency, payment_terms, notes, created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6,
            ?7, ?8, ?9, ?10, ?11,
            ?12, ?13, ?14, ?15, ?16
        )
        "#,
    )
    .bind(&invoice.id)
    .bind(&invoice.user_id)
    .bind(&invoice.customer_id)
    .bind(&invoice.sale_id)
    .bind(&invoice.invoice_number)
    .bind(invoice.invoice_date)
    .bind(invoice.due_date)
    .bind(invoice.status)
    .bind(invoice.subtotal_cents)
    .bind(invoice.tax_cents)
    .bind(invoice.total_cents)
    .bind(&invoice.currency)
    .bind(&invoice.payment_terms)
    .bind(&invoice.notes)
    .bind(invoice.created_at)
    .bind(invoice.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Inserts one invoice line.
pub async fn insert_item(conn: &mut SqliteConnection, item: &InvoiceItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO invoice_items (
            id, invoice_id, product_id, quantity, unit_price_cents,
            discount_cents, line_total_cents
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&item.id)
    .bind(&item.invoice_id)
    .bind(&item.product_id)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .bind(item.discount_cents)
    .bind(item.line_total_cents)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Deletes every item of an invoice.
pub async fn delete_items(conn: &mut SqliteConnection, invoice_id: &str) -> DbResult<u64> {
    let result = sqlx::query("DELETE FROM invoice_items WHERE invoice_id = ?1")
        .bind(invoice_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

/// Deletes an invoice header. Returns rows affected.
pub async fn delete(conn: &mut SqliteConnection, id: &str) -> DbResult<u64> {
    debug!(id = %id, "Deleting invoice");

    let result = sqlx::query("DELETE FROM invoices WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

/// Recomputed amounts and dates of an invoice.
#[derive(Debug, Clone, Copy)]
pub struct InvoiceAmounts {
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub invoice_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

/// Writes recomputed amounts and dates.
pub async fn update_amounts(
    conn: &mut SqliteConnection,
    id: &str,
    amounts: &InvoiceAmounts,
) -> DbResult<u64> {
    let result = sqlx::query(
        r#"
        UPDATE invoices SET
            subtotal_cents = ?2,
            tax_cents = ?3,
            total_cents = ?4,
            invoice_date = ?5,
            due_date = ?6,
            updated_at = ?7
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(amounts.subtotal_cents)
    .bind(amounts.tax_cents)
    .bind(amounts.total_cents)
    .bind(amounts.invoice_date)
    .bind(amounts.due_date)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

/// Sets the workflow status.
pub async fn update_status(
    conn: &mut SqliteConnection,
    id: &str,
    status: InvoiceStatus,
) -> DbResult<u64> {
    let result = sqlx::query("UPDATE invoices SET status = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

/// Number of invoices the account still has.
pub async fn count_for_account(conn: &mut SqliteConnection, account_id: &str) -> DbResult<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM invoices WHERE user_id = ?1")
        .bind(account_id)
        .fetch_one(&mut *conn)
        .await?;

    Ok(count)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for standalone invoice reads.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Invoice>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    pub async fn get_items(&self, invoice_id: &str) -> DbResult<Vec<InvoiceItem>> {
        let mut conn = self.pool.acquire().await?;
        items(&mut conn, invoice_id).await
    }

    /// Lists an account's invoices, newest first.
    pub async fn list(&self, account_id: &str) -> DbResult<Vec<Invoice>> {
        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, user_id, customer_id, sale_id, invoice_number, invoice_date,
                   due_date, status, subtotal_cents, tax_cents, total_cents,
                   currency, payment_terms, notes, created_at, updated_at
            FROM invoices
            WHERE user_id = ?1
            ORDER BY invoice_date DESC, rowid DESC
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(invoices)
    }
}
