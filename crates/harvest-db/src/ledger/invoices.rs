//! Invoice reads, status changes and deletion.
//!
//! Generation lives with the orders it is built from
//! ([`SaleGroupManager::generate_invoice`](super::SaleGroupManager::generate_invoice));
//! this module handles invoices once they exist.

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::LedgerResult;
use crate::ledger::allocator::{self, Reclaimed};
use crate::ledger::{authorize, begin_write, LedgerConfig};
use crate::repository::invoice;
use harvest_core::{Actor, CoreError, Invoice, InvoiceStatus, InvoiceWithItems};

/// Result of deleting an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDeletion {
    pub invoice_number: String,
    /// How the freed number went back into circulation.
    pub reclaimed: Reclaimed,
    /// True when this was the account's last invoice and numbering restarted.
    pub counter_reset: bool,
}

/// Pool-backed invoice operations.
#[derive(Debug, Clone)]
pub struct InvoiceDesk {
    pool: SqlitePool,
    config: LedgerConfig,
}

impl InvoiceDesk {
    pub fn new(pool: SqlitePool, config: LedgerConfig) -> Self {
        InvoiceDesk { pool, config }
    }

    /// The number the account's next invoice would get.
    pub async fn preview_number(&self, actor: &Actor) -> LedgerResult<String> {
        let mut tx = begin_write(&self.pool).await?;
        let number = allocator::peek_next_number(&mut tx, &actor.account_id, &self.config).await?;
        tx.commit().await?;
        Ok(number)
    }

    pub async fn list(&self, actor: &Actor) -> LedgerResult<Vec<Invoice>> {
        let invoices = crate::repository::InvoiceRepository::new(self.pool.clone())
            .list(&actor.account_id)
            .await?;
        Ok(invoices)
    }

    pub async fn get_with_items(&self, actor: &Actor, invoice_id: &str) -> LedgerResult<InvoiceWithItems> {
        let mut conn = self.pool.acquire().await?;

        let stored = invoice::fetch(&mut conn, invoice_id)
            .await?
            .ok_or_else(|| CoreError::InvoiceNotFound(invoice_id.to_string()))?;
        authorize(actor, &stored.user_id, &invoice_resource(invoice_id))?;
        let items = invoice::items(&mut conn, invoice_id).await?;

        Ok(InvoiceWithItems {
            invoice: stored,
            items,
        })
    }

    /// Moves an invoice along its workflow.
    ///
    /// ## Errors
    /// * `InvalidInvoiceTransition` - e.g. a paid invoice back to draft
    pub async fn update_status(
        &self,
        actor: &Actor,
        invoice_id: &str,
        status: InvoiceStatus,
    ) -> LedgerResult<Invoice> {
        let mut tx = begin_write(&self.pool).await?;

        let stored = invoice::fetch(&mut tx, invoice_id)
            .await?
            .ok_or_else(|| CoreError::InvoiceNotFound(invoice_id.to_string()))?;
        authorize(actor, &stored.user_id, &invoice_resource(invoice_id))?;

        if stored.status != status && !stored.status.can_transition_to(status) {
            return Err(CoreError::InvalidInvoiceTransition {
                invoice_number: stored.invoice_number,
                from: stored.status.to_string(),
                to: status.to_string(),
            }
            .into());
        }

        invoice::update_status(&mut tx, invoice_id, status).await?;
        let updated = invoice::fetch(&mut tx, invoice_id)
            .await?
            .ok_or_else(|| CoreError::InvoiceNotFound(invoice_id.to_string()))?;

        tx.commit().await?;

        info!(invoice_number = %updated.invoice_number, from = %stored.status, to = %status, "Invoice status changed");
        Ok(updated)
    }

    /// Deletes an invoice and its items, returning its number to circulation.
    ///
    /// The sales it was built from stay untouched and become invoiceable again.
    pub async fn delete_invoice(&self, actor: &Actor, invoice_id: &str) -> LedgerResult<InvoiceDeletion> {
        let mut tx = begin_write(&self.pool).await?;

        let stored = invoice::fetch(&mut tx, invoice_id)
            .await?
            .ok_or_else(|| CoreError::InvoiceNotFound(invoice_id.to_string()))?;
        authorize(actor, &stored.user_id, &invoice_resource(invoice_id))?;

        invoice::delete_items(&mut tx, invoice_id).await?;
        invoice::delete(&mut tx, invoice_id).await?;
        let reclaimed = allocator::reclaim(&mut tx, &stored.user_id, &stored.invoice_number).await?;
        let counter_reset = allocator::reset_if_empty(&mut tx, &stored.user_id).await?;

        tx.commit().await?;

        info!(
            invoice_number = %stored.invoice_number,
            reclaimed = ?reclaimed,
            counter_reset,
            "Invoice deleted"
        );

        Ok(InvoiceDeletion {
            invoice_number: stored.invoice_number,
            reclaimed,
            counter_reset,
        })
    }
}

fn invoice_resource(invoice_id: &str) -> String {
    format!("invoice {invoice_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::ledger::testing::{fixture, Fixture};
    use crate::ledger::NewOrder;
    use harvest_core::{OrderLine, Product, SaleStatus};

    async fn invoiced_sale(fx: &Fixture, product: &Product, quantity: i64) -> InvoiceWithItems {
        let order = fx
            .db
            .orders()
            .create_order(
                &fx.actor,
                NewOrder {
                    customer_id: fx.customer.id.clone(),
                    status: SaleStatus::Unpaid,
                    sale_date: None,
                    platform_source: None,
                    notes: None,
                    lines: vec![OrderLine {
                        product_id: product.id.clone(),
                        quantity,
                        unit_price_cents: product.selling_price_cents,
                        discount_cents: 0,
                    }],
                },
            )
            .await
            .unwrap();

        fx.db
            .orders()
            .generate_invoice(&fx.actor, &order.sales[0].id)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_deleted_number_is_previewed_again() {
        let fx = fixture().await;
        let first = invoiced_sale(&fx, &fx.p1, 1).await;
        let second = invoiced_sale(&fx, &fx.p2, 1).await;
        assert_eq!(second.invoice.invoice_number, "INV-0002");

        let desk = fx.db.invoicing();
        let deletion = desk.delete_invoice(&fx.actor, &second.invoice.id).await.unwrap();
        assert_eq!(deletion.reclaimed, Reclaimed::Rewound);
        assert!(!deletion.counter_reset);
        assert_eq!(desk.preview_number(&fx.actor).await.unwrap(), "INV-0002");

        // an older number goes to the queue and is handed out first
        invoiced_sale(&fx, &fx.p2, 1).await;
        let deletion = desk.delete_invoice(&fx.actor, &first.invoice.id).await.unwrap();
        assert_eq!(deletion.reclaimed, Reclaimed::Queued);
        assert_eq!(desk.preview_number(&fx.actor).await.unwrap(), "INV-0001");
    }

    #[tokio::test]
    async fn test_deleting_last_invoice_resets_numbering() {
        let fx = fixture().await;
        let first = invoiced_sale(&fx, &fx.p1, 1).await;
        let second = invoiced_sale(&fx, &fx.p1, 1).await;
        let desk = fx.db.invoicing();

        desk.delete_invoice(&fx.actor, &first.invoice.id).await.unwrap();
        let last = desk.delete_invoice(&fx.actor, &second.invoice.id).await.unwrap();

        assert!(last.counter_reset);
        assert!(fx.db.settings().reusable_numbers(&fx.actor.account_id).await.unwrap().is_empty());
        assert_eq!(desk.preview_number(&fx.actor).await.unwrap(), "INV-0001");
    }

    #[tokio::test]
    async fn test_deleted_invoice_frees_its_sale() {
        let fx = fixture().await;
        let generated = invoiced_sale(&fx, &fx.p1, 2).await;
        let sale_id = generated.invoice.sale_id.clone().unwrap();

        fx.db
            .invoicing()
            .delete_invoice(&fx.actor, &generated.invoice.id)
            .await
            .unwrap();

        assert!(fx.db.sales().get_by_id(&sale_id).await.unwrap().is_some());
        assert_eq!(fx.stock(&fx.p1).await, 18);
        let again = fx.db.orders().generate_invoice(&fx.actor, &sale_id).await.unwrap();
        assert_eq!(again.invoice.invoice_number, "INV-0001");
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let fx = fixture().await;
        let generated = invoiced_sale(&fx, &fx.p1, 1).await;
        let desk = fx.db.invoicing();
        let id = &generated.invoice.id;

        let sent = desk.update_status(&fx.actor, id, InvoiceStatus::Sent).await.unwrap();
        assert_eq!(sent.status, InvoiceStatus::Sent);
        let paid = desk.update_status(&fx.actor, id, InvoiceStatus::Paid).await.unwrap();
        assert_eq!(paid.status, InvoiceStatus::Paid);

        let err = desk
            .update_status(&fx.actor, id, InvoiceStatus::Draft)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Core(CoreError::InvalidInvoiceTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_foreign_invoice_is_forbidden() {
        let fx = fixture().await;
        let generated = invoiced_sale(&fx, &fx.p1, 1).await;

        let err = fx
            .db
            .invoicing()
            .delete_invoice(&Actor::owner("farm-2"), &generated.invoice.id)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Core(CoreError::Forbidden { .. })));
        assert_eq!(fx.db.invoicing().list(&fx.actor).await.unwrap().len(), 1);
    }
}
