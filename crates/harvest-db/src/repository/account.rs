//! # Account Membership Repository
//!
//! Maps login identities onto business accounts.
//!
//! ```text
//! identity "alice"  ──┐
//! identity "bob"    ──┼──►  account "farm-1"   (one settings row, one counter)
//! identity "farm-1" ──┘     (no row needed: an unlisted identity is its own account)
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;
use harvest_core::Actor;

/// Repository for the identity → account relation.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AccountRepository { pool }
    }

    /// Resolves the account an identity acts for.
    pub async fn resolve(&self, identity_id: &str) -> DbResult<Actor> {
        let account_id = sqlx::query_scalar::<_, String>(
            "SELECT account_id FROM account_members WHERE identity_id = ?1",
        )
        .bind(identity_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(Actor::new(
            identity_id,
            account_id.unwrap_or_else(|| identity_id.to_string()),
        ))
    }

    /// Grants `identity_id` access to `account_id`, replacing any previous membership.
    pub async fn add_member(&self, identity_id: &str, account_id: &str) -> DbResult<()> {
        info!(identity_id = %identity_id, account_id = %account_id, "Adding account member");

        sqlx::query(
            r#"
            INSERT INTO account_members (identity_id, account_id, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (identity_id) DO UPDATE SET account_id = excluded.account_id
            "#,
        )
        .bind(identity_id)
        .bind(account_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Revokes a membership. Returns true when one existed.
    pub async fn remove_member(&self, identity_id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM account_members WHERE identity_id = ?1")
            .bind(identity_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Identities that share `account_id`.
    pub async fn members(&self, account_id: &str) -> DbResult<Vec<String>> {
        let members = sqlx::query_scalar::<_, String>(
            "SELECT identity_id FROM account_members WHERE account_id = ?1 ORDER BY identity_id",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }
}
