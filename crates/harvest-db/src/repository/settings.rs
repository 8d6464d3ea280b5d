//! # Settings Repository
//!
//! Business settings per account, which double as the invoice counter, plus
//! the queue of reusable invoice numbers.
//!
//! ## Counter Claims
//! ```text
//! UPDATE user_settings
//! SET next_invoice_number = next_invoice_number + 1
//! WHERE user_id = ?
//! RETURNING invoice_prefix, next_invoice_number - 1   ◄── the claimed value
//! ```
//! One statement, so two concurrent allocations can never read the same
//! counter value.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use harvest_core::validation::{validate_invoice_prefix, validate_tax_rate_bps};
use harvest_core::{BusinessSettings, ReusableInvoiceNumber};

// =============================================================================
// Settings rows
// =============================================================================

/// Fetches the settings of an account.
pub async fn fetch(conn: &mut SqliteConnection, account_id: &str) -> DbResult<Option<BusinessSettings>> {
    let settings = sqlx::query_as::<_, BusinessSettings>(
        r#"
        SELECT user_id, invoice_prefix, next_invoice_number, currency, tax_rate_bps,
               payment_terms, bank_details, created_at, updated_at
        FROM user_settings
        WHERE user_id = ?1
        "#,
    )
    .bind(account_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(settings)
}

/// Default values for a freshly provisioned account.
#[derive(Debug, Clone)]
pub struct SettingsDefaults<'a> {
    pub invoice_prefix: &'a str,
    pub currency: &'a str,
    pub payment_terms: &'a str,
}

/// Creates the settings row unless one exists. Returns true when created.
pub async fn insert_default(
    conn: &mut SqliteConnection,
    account_id: &str,
    defaults: &SettingsDefaults<'_>,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO user_settings (
            user_id, invoice_prefix, next_invoice_number, currency, tax_rate_bps,
            payment_terms, bank_details, created_at, updated_at
        ) VALUES (?1, ?2, 1, ?3, 0, ?4, NULL, ?5, ?5)
        ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(account_id)
    .bind(defaults.invoice_prefix)
    .bind(defaults.currency)
    .bind(defaults.payment_terms)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Atomically claims the current counter value and advances it.
///
/// Returns `(prefix, claimed)` or `None` when the account has no settings.
pub async fn claim_counter(
    conn: &mut SqliteConnection,
    account_id: &str,
) -> DbResult<Option<(String, i64)>> {
    let claimed = sqlx::query_as::<_, (String, i64)>(
        r#"
        UPDATE user_settings
        SET next_invoice_number = next_invoice_number + 1,
            updated_at = ?2
        WHERE user_id = ?1
        RETURNING invoice_prefix, next_invoice_number - 1
        "#,
    )
    .bind(account_id)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(claimed)
}

/// Steps the counter back by one (never below 1). Returns rows affected.
pub async fn rewind_counter(conn: &mut SqliteConnection, account_id: &str) -> DbResult<u64> {
    let result = sqlx::query(
        r#"
        UPDATE user_settings
        SET next_invoice_number = next_invoice_number - 1,
            updated_at = ?2
        WHERE user_id = ?1 AND next_invoice_number > 1
        "#,
    )
    .bind(account_id)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

/// Sets the counter back to 1.
pub async fn reset_counter(conn: &mut SqliteConnection, account_id: &str) -> DbResult<()> {
    sqlx::query(
        "UPDATE user_settings SET next_invoice_number = 1, updated_at = ?2 WHERE user_id = ?1",
    )
    .bind(account_id)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Reusable number queue (FIFO by AUTOINCREMENT id)
// =============================================================================

/// Oldest queued number, without consuming it.
pub async fn peek_reusable(conn: &mut SqliteConnection, account_id: &str) -> DbResult<Option<String>> {
    let number = sqlx::query_scalar::<_, String>(
        r#"
        SELECT invoice_number
        FROM reusable_invoice_numbers
        WHERE user_id = ?1
        ORDER BY id
        LIMIT 1
        "#,
    )
    .bind(account_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(number)
}

/// Removes and returns the oldest queued number in one statement.
pub async fn pop_reusable(conn: &mut SqliteConnection, account_id: &str) -> DbResult<Option<String>> {
    let number = sqlx::query_scalar::<_, String>(
        r#"
        DELETE FROM reusable_invoice_numbers
        WHERE id = (
            SELECT id FROM reusable_invoice_numbers
            WHERE user_id = ?1
            ORDER BY id
            LIMIT 1
        )
        RETURNING invoice_number
        "#,
    )
    .bind(account_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(number)
}

/// Appends a number to the account's queue. Already-queued numbers are ignored.
pub async fn push_reusable(
    conn: &mut SqliteConnection,
    account_id: &str,
    number: &str,
) -> DbResult<()> {
    debug!(account_id = %account_id, number = %number, "Queueing invoice number for reuse");

    sqlx::query(
        r#"
        INSERT INTO reusable_invoice_numbers (user_id, invoice_number, created_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT (user_id, invoice_number) DO NOTHING
        "#,
    )
    .bind(account_id)
    .bind(number)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Empties the account's queue. Returns how many numbers were dropped.
pub async fn clear_reusable(conn: &mut SqliteConnection, account_id: &str) -> DbResult<u64> {
    let result = sqlx::query("DELETE FROM reusable_invoice_numbers WHERE user_id = ?1")
        .bind(account_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

/// The queue in consumption order.
pub async fn list_reusable(
    conn: &mut SqliteConnection,
    account_id: &str,
) -> DbResult<Vec<ReusableInvoiceNumber>> {
    let numbers = sqlx::query_as::<_, ReusableInvoiceNumber>(
        r#"
        SELECT id, user_id, invoice_number, created_at
        FROM reusable_invoice_numbers
        WHERE user_id = ?1
        ORDER BY id
        "#,
    )
    .bind(account_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(numbers)
}

// =============================================================================
// Repository
// =============================================================================

/// Editable business preferences. The counter is not editable here.
#[derive(Debug, Clone)]
pub struct SettingsUpdate {
    pub invoice_prefix: String,
    pub currency: String,
    pub tax_rate_bps: i64,
    pub payment_terms: String,
    pub bank_details: Option<String>,
}

/// Repository for standalone settings access.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    pub async fn get(&self, account_id: &str) -> DbResult<Option<BusinessSettings>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, account_id).await
    }

    /// Queued reusable numbers, oldest first.
    pub async fn reusable_numbers(&self, account_id: &str) -> DbResult<Vec<ReusableInvoiceNumber>> {
        let mut conn = self.pool.acquire().await?;
        list_reusable(&mut conn, account_id).await
    }

    /// Updates preferences of an existing settings row.
    pub async fn update(&self, account_id: &str, update: &SettingsUpdate) -> DbResult<BusinessSettings> {
        validate_invoice_prefix(&update.invoice_prefix)?;
        validate_tax_rate_bps(update.tax_rate_bps)?;

        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query(
            r#"
            UPDATE user_settings SET
                invoice_prefix = ?2,
                currency = ?3,
                tax_rate_bps = ?4,
                payment_terms = ?5,
                bank_details = ?6,
                updated_at = ?7
            WHERE user_id = ?1
            "#,
        )
        .bind(account_id)
        .bind(&update.invoice_prefix)
        .bind(update.currency.trim().to_uppercase())
        .bind(update.tax_rate_bps)
        .bind(update.payment_terms.trim())
        .bind(&update.bank_details)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Settings", account_id));
        }

        fetch(&mut conn, account_id)
            .await?
            .ok_or_else(|| DbError::not_found("Settings", account_id))
    }
}
