//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Lookups by id / SKU, listing per account
//! - Guarded atomic stock adjustment (used by the stock ledger)
//!
//! Stock is deliberately absent from [`ProductRepository::update_details`]:
//! after creation it only moves through [`add_stock`].
//!
//! ## Stock Update
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  ❌ Read-modify-write (lost update under concurrent sales)          │
//! │     SELECT stock → 12;  UPDATE products SET stock = 9               │
//! │                                                                     │
//! │  ✅ Single guarded statement                                        │
//! │     UPDATE products SET stock = stock + Δ                           │
//! │     WHERE id = ? AND stock + Δ >= 0                                 │
//! │     RETURNING stock                                                 │
//! │                                                                     │
//! │  No row back → product missing OR the change would go negative.     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use harvest_core::validation::{validate_amount_cents, validate_product_name, validate_sku};
use harvest_core::{Product, ProductStatus};

// =============================================================================
// Connection-level operations (usable inside a transaction)
// =============================================================================

/// Fetches a product by id.
pub async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
        r#"
        SELECT id, user_id, sku, name, cost_price_cents, selling_price_cents,
               stock, status, created_at, updated_at
        FROM products
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(product)
}

/// Atomically adds `delta` to stock unless the result would be negative.
///
/// Returns the new stock, or `None` when the product does not exist or the
/// guard rejected the change.
pub async fn add_stock(conn: &mut SqliteConnection, id: &str, delta: i64) -> DbResult<Option<i64>> {
    debug!(id = %id, delta = %delta, "Adjusting stock");

    let stock = sqlx::query_scalar::<_, i64>(
        r#"
        UPDATE products
        SET stock = stock + ?2,
            updated_at = ?3
        WHERE id = ?1 AND stock + ?2 >= 0
        RETURNING stock
        "#,
    )
    .bind(id)
    .bind(delta)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(stock)
}

/// Current on-hand quantity, `None` for an unknown product.
pub async fn stock_of(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<i64>> {
    let stock = sqlx::query_scalar::<_, i64>("SELECT stock FROM products WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(stock)
}

// =============================================================================
// Repository
// =============================================================================

/// Fields accepted when creating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub cost_price_cents: i64,
    pub selling_price_cents: i64,
    /// Opening stock.
    pub stock: i64,
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let corn = repo.create("farm-1", &new_product).await?;
/// let same = repo.get_by_sku("CORN-01").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    /// Gets a product by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, user_id, sku, name, cost_price_cents, selling_price_cents,
                   stock, status, created_at, updated_at
            FROM products
            WHERE sku = ?1
            "#,
        )
        .bind(sku.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists an account's products by name.
    pub async fn list(&self, account_id: &str) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, user_id, sku, name, cost_price_cents, selling_price_cents,
                   stock, status, created_at, updated_at
            FROM products
            WHERE user_id = ?1
            ORDER BY name
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Inserts a new product owned by `account_id`.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    pub async fn create(&self, account_id: &str, new: &NewProduct) -> DbResult<Product> {
        validate_sku(&new.sku)?;
        validate_product_name(&new.name)?;
        validate_amount_cents("costPrice", new.cost_price_cents)?;
        validate_amount_cents("sellingPrice", new.selling_price_cents)?;
        validate_amount_cents("stock", new.stock)?;

        debug!(sku = %new.sku, "Inserting product");

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            user_id: account_id.to_string(),
            sku: new.sku.trim().to_string(),
            name: new.name.trim().to_string(),
            cost_price_cents: new.cost_price_cents,
            selling_price_cents: new.selling_price_cents,
            stock: new.stock,
            status: ProductStatus::Active,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO products (
                id, user_id, sku, name, cost_price_cents, selling_price_cents,
                stock, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(&product.user_id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.cost_price_cents)
        .bind(product.selling_price_cents)
        .bind(product.stock)
        .bind(product.status)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &product.sku),
            other => other,
        })?;

        Ok(product)
    }

    /// Updates catalog fields. Stock is not touched here.
    pub async fn update_details(&self, product: &Product) -> DbResult<()> {
        validate_sku(&product.sku)?;
        validate_product_name(&product.name)?;
        validate_amount_cents("costPrice", product.cost_price_cents)?;
        validate_amount_cents("sellingPrice", product.selling_price_cents)?;

        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                sku = ?2,
                name = ?3,
                cost_price_cents = ?4,
                selling_price_cents = ?5,
                status = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.cost_price_cents)
        .bind(product.selling_price_cents)
        .bind(product.status)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use harvest_core::ValidationError;

    fn corn() -> NewProduct {
        NewProduct {
            sku: "CORN-01".into(),
            name: "Sweet Corn".into(),
            cost_price_cents: 600,
            selling_price_cents: 1000,
            stock: 5,
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let created = repo.create("farm-1", &corn()).await.unwrap();
        let by_sku = repo.get_by_sku("CORN-01").await.unwrap().unwrap();
        assert_eq!(by_sku.id, created.id);
        assert_eq!(by_sku.stock, 5);
        assert_eq!(repo.list("farm-1").await.unwrap().len(), 1);
        assert!(repo.list("farm-2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_sku_is_reported() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.create("farm-1", &corn()).await.unwrap();
        let err = repo.create("farm-1", &corn()).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref value, .. } if value == "CORN-01"));
    }

    #[tokio::test]
    async fn test_guarded_stock_adjustment() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db.products().create("farm-1", &corn()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        assert_eq!(add_stock(&mut conn, &product.id, -3).await.unwrap(), Some(2));
        assert_eq!(add_stock(&mut conn, &product.id, -3).await.unwrap(), None);
        assert_eq!(stock_of(&mut conn, &product.id).await.unwrap(), Some(2));
        assert_eq!(add_stock(&mut conn, "missing", 1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_details_keeps_stock() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        let mut product = repo.create("farm-1", &corn()).await.unwrap();

        product.name = "Bicolor Corn".into();
        product.stock = 999;
        repo.update_details(&product).await.unwrap();

        let stored = repo.get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Bicolor Corn");
        assert_eq!(stored.stock, 5);
    }

    #[tokio::test]
    async fn test_update_details_rejects_unbounded_price() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        let mut product = repo.create("farm-1", &corn()).await.unwrap();

        product.selling_price_cents = 4_000_000_000_000_000_000;
        let err = repo.update_details(&product).await.unwrap_err();
        assert!(matches!(err, DbError::Invalid(ValidationError::OutOfRange { ref field, .. }) if field == "sellingPrice"));

        let stored = repo.get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.selling_price_cents, 1000);
    }
}
