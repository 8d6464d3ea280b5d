//! # Customer Repository
//!
//! Plain persistence for customers. Orders only need to resolve a customer
//! and confirm which account owns it.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use harvest_core::Customer;
use harvest_core::ValidationError;

/// Fetches a customer by id.
pub async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>(
        "SELECT id, user_id, name, email, phone, created_at FROM customers WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(customer)
}

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    /// Lists an account's customers by name.
    pub async fn list(&self, account_id: &str) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, user_id, name, email, phone, created_at
            FROM customers
            WHERE user_id = ?1
            ORDER BY name
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// Inserts a customer owned by `account_id`.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - email already registered
    pub async fn create(
        &self,
        account_id: &str,
        name: &str,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> DbResult<Customer> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::Required {
                field: "name".to_string(),
            }
            .into());
        }

        debug!(name = %name, "Inserting customer");

        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            user_id: account_id.to_string(),
            name: name.to_string(),
            email: email.map(|e| e.trim().to_lowercase()).filter(|e| !e.is_empty()),
            phone: phone.map(str::to_string),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO customers (id, user_id, name, email, phone, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.user_id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => {
                DbError::duplicate(field, customer.email.clone().unwrap_or_default())
            }
            other => other,
        })?;

        Ok(customer)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_create_and_list() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.customers();

        let created = repo
            .create("farm-1", "Greenway Grocers", Some("Orders@Greenway.test"), None)
            .await
            .unwrap();
        assert_eq!(created.email.as_deref(), Some("orders@greenway.test"));

        let fetched = repo.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Greenway Grocers");
        assert_eq!(repo.list("farm-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.customers();

        repo.create("farm-1", "A", Some("a@b.test"), None).await.unwrap();
        let err = repo.create("farm-1", "B", Some("a@b.test"), None).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "email"));
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.customers().create("farm-1", "  ", None, None).await.unwrap_err();
        assert!(matches!(err, DbError::Invalid(_)));
    }
}
