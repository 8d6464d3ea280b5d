//! # Sale Group Manager
//!
//! Creates, edits, deletes and invoices orders while keeping sale rows,
//! stock and invoices consistent.
//!
//! ## Workflows
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  create_order     validate lines → check ALL stock → decrement each     │
//! │                   → insert rows (shared group id when > 1 line)         │
//! │                                                                         │
//! │  update_status    status / channel / notes / date on every row          │
//! │                   invoices untouched                                    │
//! │                                                                         │
//! │  update_sale      one row, full edit; stock moves by the difference;    │
//! │                   linked invoice is recomputed when amounts or date move│
//! │                                                                         │
//! │  update_order     check stock (old rows count as returned)              │
//! │                   → drop linked invoices, reclaim their numbers         │
//! │                   → restore stock, delete non-anchor rows               │
//! │                   → decrement, rewrite anchor, insert the rest          │
//! │                                                                         │
//! │  delete_order     refuse if invoiced → restore stock → delete rows      │
//! │                                                                         │
//! │  generate_invoice refuse if invoiced → allocate number → invoice with   │
//! │                   one item per row, dated on the sale date, due +30d    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every workflow runs inside one transaction; a failure at any step rolls
//! the whole workflow back.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, LedgerResult};
use crate::ledger::{allocator, authorize, begin_write, stock, LedgerConfig};
use crate::repository::invoice::InvoiceAmounts;
use crate::repository::sale::SaleHeader;
use crate::repository::{customer, invoice, sale};
use harvest_core::group::{clean_notes, new_group_id};
use harvest_core::numbering::due_date;
use harvest_core::order::{needs_group, requested_quantities};
use harvest_core::pricing::reprice_sale;
use harvest_core::validation::{
    validate_notes, validate_order_line, validate_order_lines, validate_platform_source,
    validate_uuid,
};
use harvest_core::{
    Actor, CoreError, Customer, Invoice, InvoiceItem, InvoiceRef, InvoiceStatus,
    InvoiceWithItems, OrderLine, OrderState, Product, Sale, SaleGroup, SaleStatus, StockWarning,
    ValidationError,
};

// =============================================================================
// Requests
// =============================================================================

/// A new order of one or more product lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub customer_id: String,
    #[serde(default)]
    pub status: SaleStatus,
    /// Defaults to now.
    #[serde(default)]
    pub sale_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub platform_source: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub lines: Vec<OrderLine>,
}

/// Order-level fields changed without touching lines.
///
/// `None` keeps the stored value; an empty string clears it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: SaleStatus,
    #[serde(default)]
    pub platform_source: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub sale_date: Option<DateTime<Utc>>,
}

/// Full replacement of one sale row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleEdit {
    pub customer_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    #[serde(default)]
    pub discount_cents: i64,
    pub status: SaleStatus,
    pub sale_date: DateTime<Utc>,
    #[serde(default)]
    pub platform_source: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// New composition for an existing order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEdit {
    pub customer_id: String,
    pub status: SaleStatus,
    pub sale_date: DateTime<Utc>,
    #[serde(default)]
    pub platform_source: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub lines: Vec<OrderLine>,
}

// =============================================================================
// Outcomes
// =============================================================================

/// Rows written by `create_order` / `update_order`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderOutcome {
    pub group_id: Option<String>,
    pub sales: Vec<Sale>,
    pub stock_warnings: Vec<StockWarning>,
    /// Numbers of invoices dropped by a composition edit.
    pub released_invoice_numbers: Vec<String>,
}

/// Result of a single-row edit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleEditOutcome {
    pub sale: Sale,
    pub stock_warnings: Vec<StockWarning>,
    /// Invoices recomputed because the row's amounts or date changed.
    pub invoices: Vec<InvoiceWithItems>,
}

/// Result of `delete_order`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDeletion {
    pub deleted_count: usize,
    pub deleted_ids: Vec<String>,
    /// Quantity put back per product id.
    pub restored_stock: BTreeMap<String, i64>,
}

/// An order as shown to callers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub group_id: Option<String>,
    #[serde(flatten)]
    pub state: OrderState,
    pub sales: Vec<Sale>,
    pub invoices: Vec<InvoiceRef>,
    pub subtotal_cents: i64,
}

impl From<SaleGroup> for OrderView {
    fn from(group: SaleGroup) -> Self {
        OrderView {
            state: group.state(),
            subtotal_cents: group.subtotal().cents(),
            group_id: group.group_id,
            sales: group.members,
            invoices: group.invoices,
        }
    }
}

// =============================================================================
// Manager
// =============================================================================

/// Entry point for order workflows.
///
/// ## Usage
/// ```rust,ignore
/// let orders = db.orders();
/// let created = orders.create_order(&actor, new_order).await?;
/// let invoice = orders.generate_invoice(&actor, &created.sales[0].id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct SaleGroupManager {
    pool: SqlitePool,
    config: LedgerConfig,
}

impl SaleGroupManager {
    pub fn new(pool: SqlitePool, config: LedgerConfig) -> Self {
        SaleGroupManager { pool, config }
    }

    /// Loads the order containing `sale_id`.
    pub async fn get_order(&self, actor: &Actor, sale_id: &str) -> LedgerResult<OrderView> {
        let mut conn = self.pool.acquire().await?;
        let group = load_group(&mut conn, sale_id).await?;
        authorize(actor, &group.anchor()?.user_id, &sale_resource(sale_id))?;
        Ok(group.into())
    }

    /// Creates an order of one or more lines.
    ///
    /// ## Errors
    /// * `Validation` - malformed lines or fields
    /// * `CustomerNotFound` / `ProductNotFound` - unknown or foreign ids
    /// * `InsufficientStock` - any line exceeds stock; nothing is written
    pub async fn create_order(&self, actor: &Actor, order: NewOrder) -> LedgerResult<OrderOutcome> {
        validate_order_lines(&order.lines)?;
        validate_notes(order.notes.as_deref())?;
        validate_platform_source(order.platform_source.as_deref())?;

        let mut tx = begin_write(&self.pool).await?;

        let customer = resolve_customer(&mut tx, actor, &order.customer_id).await?;
        let requested = requested_quantities(&order.lines);
        let products =
            stock::check_availability(&mut tx, &actor.account_id, &requested, &BTreeMap::new())
                .await?;

        let now = Utc::now();
        let group_id = needs_group(order.lines.len()).then(new_group_id);
        let header = OrderHeader {
            status: order.status,
            sale_date: order.sale_date.unwrap_or(now),
            platform_source: clean_text(order.platform_source.as_deref()),
            notes: clean_notes(order.notes.as_deref()),
        };

        let mut warnings = Warnings::default();
        let mut sales = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            let product = priced_product(&products, &line.product_id)?;
            warnings.record(
                stock::decrement(&mut tx, product, line.quantity, self.config.low_stock_threshold)
                    .await?,
            );

            let row = line_row(&actor.account_id, &customer.id, &header, line, product, group_id.as_deref(), now);
            sale::insert(&mut tx, &row).await?;
            sales.push(row);
        }

        tx.commit().await?;

        info!(
            account_id = %actor.account_id,
            customer_id = %customer.id,
            lines = sales.len(),
            group_id = ?group_id,
            "Order created"
        );

        Ok(OrderOutcome {
            group_id,
            sales,
            stock_warnings: warnings.into_vec(),
            released_invoice_numbers: Vec::new(),
        })
    }

    /// Changes order-level fields on every row of the order.
    ///
    /// Never touches lines, stock or invoices.
    pub async fn update_status(
        &self,
        actor: &Actor,
        sale_id: &str,
        update: StatusUpdate,
    ) -> LedgerResult<Vec<Sale>> {
        validate_notes(update.notes.as_deref())?;
        validate_platform_source(update.platform_source.as_deref())?;

        let mut tx = begin_write(&self.pool).await?;

        let group = load_group(&mut tx, sale_id).await?;
        authorize(actor, &group.anchor()?.user_id, &sale_resource(sale_id))?;

        let platform_source = update.platform_source.as_deref().map(|p| clean_text(Some(p)));
        let notes = update.notes.as_deref().map(|n| clean_notes(Some(n)));

        for member in &group.members {
            let member_platform = match &platform_source {
                Some(value) => value.clone(),
                None => member.platform_source.clone(),
            };
            let member_notes = match &notes {
                Some(value) => value.clone(),
                None => member.notes.clone(),
            };
            let header = SaleHeader {
                status: update.status,
                sale_date: update.sale_date.unwrap_or(member.sale_date),
                platform_source: member_platform.as_deref(),
                notes: member_notes.as_deref(),
            };
            sale::update_header(&mut tx, &member.id, &header).await?;
        }

        let refreshed = load_group(&mut tx, sale_id).await?;
        tx.commit().await?;

        info!(sale_id = %sale_id, status = %update.status, rows = refreshed.members.len(), "Order status updated");
        Ok(refreshed.members)
    }

    /// Full edit of one sale row.
    ///
    /// Stock moves by the difference (old product restored and new product
    /// taken when the product changes). Status, sale date and platform
    /// source are order-level: on a grouped row they are written to every
    /// row of the order. When quantity, price, discount, product or date
    /// change and the order is invoiced, the invoice is recomputed from the
    /// live order.
    pub async fn update_sale(
        &self,
        actor: &Actor,
        sale_id: &str,
        edit: SaleEdit,
    ) -> LedgerResult<SaleEditOutcome> {
        let line = OrderLine {
            product_id: edit.product_id.clone(),
            quantity: edit.quantity,
            unit_price_cents: edit.unit_price_cents,
            discount_cents: edit.discount_cents,
        };
        validate_order_line(&line)?;
        validate_notes(edit.notes.as_deref())?;
        validate_platform_source(edit.platform_source.as_deref())?;

        let mut tx = begin_write(&self.pool).await?;

        let group = load_group(&mut tx, sale_id).await?;
        let current = group
            .members
            .iter()
            .find(|member| member.id == sale_id)
            .cloned()
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;
        authorize(actor, &current.user_id, &sale_resource(sale_id))?;

        if edit.customer_id != current.customer_id {
            if current.is_grouped() {
                return Err(ValidationError::Immutable {
                    field: "customerId".to_string(),
                    reason: "rows of a multi-product order share one customer; edit the whole order"
                        .to_string(),
                }
                .into());
            }
            if !group.invoices.is_empty() {
                return Err(ValidationError::Immutable {
                    field: "customerId".to_string(),
                    reason: format!(
                        "sale is invoiced as {}; delete the invoice first",
                        group.invoice_numbers().join(", ")
                    ),
                }
                .into());
            }
            resolve_customer(&mut tx, actor, &edit.customer_id).await?;
        }

        let requested = BTreeMap::from([(line.product_id.clone(), line.quantity)]);
        let returned = BTreeMap::from([(current.product_id.clone(), current.quantity)]);
        let products =
            stock::check_availability(&mut tx, &actor.account_id, &requested, &returned).await?;
        let product = priced_product(&products, &line.product_id)?;

        let threshold = self.config.low_stock_threshold;
        let mut warnings = Warnings::default();
        if current.product_id == line.product_id {
            let delta = line.quantity - current.quantity;
            if delta > 0 {
                warnings.record(stock::decrement(&mut tx, product, delta, threshold).await?);
            } else if delta < 0 {
                stock::restore(&mut tx, &current.product_id, -delta).await?;
            }
        } else {
            stock::restore(&mut tx, &current.product_id, current.quantity).await?;
            warnings.record(stock::decrement(&mut tx, product, line.quantity, threshold).await?);
        }

        let amounts_changed = current.product_id != line.product_id
            || current.quantity != line.quantity
            || current.unit_price_cents != line.unit_price_cents
            || current.discount_cents != line.discount_cents;
        let date_changed = current.sale_date != edit.sale_date;

        let mut updated = current;
        updated.customer_id = edit.customer_id;
        updated.product_id = line.product_id;
        updated.quantity = line.quantity;
        updated.unit_price_cents = line.unit_price_cents;
        updated.discount_cents = line.discount_cents;
        updated.status = edit.status;
        updated.sale_date = edit.sale_date;
        updated.platform_source = clean_text(edit.platform_source.as_deref());
        updated.notes = clean_notes(edit.notes.as_deref());
        updated.updated_at = Utc::now();
        reprice_sale(&mut updated, product.cost_price_cents);
        sale::update(&mut tx, &updated).await?;

        if updated.is_grouped() {
            for sibling in group.members.iter().filter(|m| m.id != updated.id) {
                let header = SaleHeader {
                    status: updated.status,
                    sale_date: updated.sale_date,
                    platform_source: updated.platform_source.as_deref(),
                    notes: sibling.notes.as_deref(),
                };
                sale::update_header(&mut tx, &sibling.id, &header).await?;
            }
        }

        let invoices = if (amounts_changed || date_changed) && !group.invoices.is_empty() {
            let live = load_group(&mut tx, sale_id).await?;
            sync_invoices(&mut tx, &self.config, &live).await?
        } else {
            Vec::new()
        };

        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            amounts_changed,
            invoices_refreshed = invoices.len(),
            "Sale updated"
        );

        Ok(SaleEditOutcome {
            sale: updated,
            stock_warnings: warnings.into_vec(),
            invoices,
        })
    }

    /// Recomputes every invoice of the order containing `sale_id` from its live rows.
    pub async fn on_sale_amounts_changed(
        &self,
        actor: &Actor,
        sale_id: &str,
    ) -> LedgerResult<Vec<InvoiceWithItems>> {
        let mut tx = begin_write(&self.pool).await?;

        let group = load_group(&mut tx, sale_id).await?;
        authorize(actor, &group.anchor()?.user_id, &sale_resource(sale_id))?;
        let invoices = sync_invoices(&mut tx, &self.config, &group).await?;

        tx.commit().await?;
        Ok(invoices)
    }

    /// Replaces the product lines of an order.
    ///
    /// ## Steps
    /// 1. Resolve the order; check stock for the new lines, counting the old
    ///    rows' quantities as returned. Nothing is written before this passes.
    /// 2. Delete every linked invoice (items first) and reclaim its number.
    /// 3. Restore stock for every old row, anchor included.
    /// 4. Delete every old row except the anchor.
    /// 5. Decrement stock for each new line; rewrite the anchor with the
    ///    first line and insert the rest, under a fresh group id when the
    ///    order still has more than one line.
    pub async fn update_order(
        &self,
        actor: &Actor,
        sale_id: &str,
        edit: OrderEdit,
    ) -> LedgerResult<OrderOutcome> {
        validate_order_lines(&edit.lines)?;
        validate_notes(edit.notes.as_deref())?;
        validate_platform_source(edit.platform_source.as_deref())?;

        let mut tx = begin_write(&self.pool).await?;

        let group = load_group(&mut tx, sale_id).await?;
        let anchor = group.anchor()?.clone();
        authorize(actor, &anchor.user_id, &sale_resource(sale_id))?;
        let customer = resolve_customer(&mut tx, actor, &edit.customer_id).await?;

        let requested = requested_quantities(&edit.lines);
        let returned = group.returned_stock();
        let products =
            stock::check_availability(&mut tx, &actor.account_id, &requested, &returned).await?;

        // newest first, so consecutive trailing numbers all rewind the counter
        let released = group.invoice_numbers();
        for linked in group.invoices.iter().rev() {
            invoice::delete_items(&mut tx, &linked.id).await?;
            invoice::delete(&mut tx, &linked.id).await?;
            allocator::reclaim(&mut tx, &actor.account_id, &linked.invoice_number).await?;
        }
        if !released.is_empty() {
            allocator::reset_if_empty(&mut tx, &actor.account_id).await?;
        }

        for (product_id, quantity) in &returned {
            stock::restore(&mut tx, product_id, *quantity).await?;
        }
        for member in group.members.iter().skip(1) {
            sale::delete(&mut tx, &member.id).await?;
        }

        let now = Utc::now();
        let group_id = needs_group(edit.lines.len()).then(new_group_id);
        let header = OrderHeader {
            status: edit.status,
            sale_date: edit.sale_date,
            platform_source: clean_text(edit.platform_source.as_deref()),
            notes: clean_notes(edit.notes.as_deref()),
        };

        let mut warnings = Warnings::default();
        let mut sales = Vec::with_capacity(edit.lines.len());
        for (index, line) in edit.lines.iter().enumerate() {
            let product = priced_product(&products, &line.product_id)?;
            warnings.record(
                stock::decrement(&mut tx, product, line.quantity, self.config.low_stock_threshold)
                    .await?,
            );

            let mut row = line_row(&actor.account_id, &customer.id, &header, line, product, group_id.as_deref(), now);
            if index == 0 {
                row.id = anchor.id.clone();
                row.created_at = anchor.created_at;
                sale::update(&mut tx, &row).await?;
            } else {
                sale::insert(&mut tx, &row).await?;
            }
            sales.push(row);
        }

        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            old_rows = group.members.len(),
            new_rows = sales.len(),
            released = ?released,
            "Order composition updated"
        );

        Ok(OrderOutcome {
            group_id,
            sales,
            stock_warnings: warnings.into_vec(),
            released_invoice_numbers: released,
        })
    }

    /// Deletes every row of the order and returns their stock.
    ///
    /// ## Errors
    /// * `OrderInvoiced` - the order still has invoice(s); names them
    pub async fn delete_order(&self, actor: &Actor, sale_id: &str) -> LedgerResult<OrderDeletion> {
        let mut tx = begin_write(&self.pool).await?;

        let group = load_group(&mut tx, sale_id).await?;
        authorize(actor, &group.anchor()?.user_id, &sale_resource(sale_id))?;
        group.ensure_deletable()?;

        let restored = group.returned_stock();
        for (product_id, quantity) in &restored {
            stock::restore(&mut tx, product_id, *quantity).await?;
        }

        let mut deleted_ids = Vec::with_capacity(group.members.len());
        for member in &group.members {
            sale::delete(&mut tx, &member.id).await?;
            deleted_ids.push(member.id.clone());
        }

        tx.commit().await?;

        info!(sale_id = %sale_id, deleted = deleted_ids.len(), "Order deleted");

        Ok(OrderDeletion {
            deleted_count: deleted_ids.len(),
            deleted_ids,
            restored_stock: restored,
        })
    }

    /// Generates the invoice for the order containing `sale_id`.
    ///
    /// ## Invoice Shape
    /// ```text
    /// number        allocator (reused number first)
    /// invoice_date  the order's sale date
    /// due_date      invoice_date + 30 days
    /// subtotal      Σ row totals
    /// tax           subtotal × account tax rate
    /// items         one per row: gross unit price, discount, net line total
    /// ```
    ///
    /// ## Errors
    /// * `AlreadyInvoiced` - an invoice already references the order; names it
    pub async fn generate_invoice(&self, actor: &Actor, sale_id: &str) -> LedgerResult<InvoiceWithItems> {
        let mut tx = begin_write(&self.pool).await?;

        let group = load_group(&mut tx, sale_id).await?;
        let anchor = group.anchor()?.clone();
        authorize(actor, &anchor.user_id, &sale_resource(sale_id))?;
        group.ensure_invoiceable()?;

        let settings = allocator::ensure_settings(&mut tx, &actor.account_id, &self.config).await?;
        let number = allocator::allocate_number(&mut tx, &actor.account_id, &self.config).await?;

        let subtotal = group.subtotal();
        let tax = subtotal.calculate_tax(settings.tax_rate());
        let now = Utc::now();

        let invoice = Invoice {
            id: Uuid::new_v4().to_string(),
            user_id: actor.account_id.clone(),
            customer_id: anchor.customer_id.clone(),
            sale_id: Some(anchor.id.clone()),
            invoice_number: number,
            invoice_date: anchor.sale_date,
            due_date: due_date(anchor.sale_date),
            status: InvoiceStatus::Draft,
            subtotal_cents: subtotal.cents(),
            tax_cents: tax.cents(),
            total_cents: (subtotal + tax).cents(),
            currency: settings.currency,
            payment_terms: settings.payment_terms,
            notes: None,
            created_at: now,
            updated_at: now,
        };

        invoice::insert(&mut tx, &invoice).await.map_err(|e| match e {
            DbError::UniqueViolation { .. } => {
                DbError::duplicate("invoiceNumber", invoice.invoice_number.clone())
            }
            other => other,
        })?;
        let items = write_items(&mut tx, &invoice.id, &group.members).await?;

        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            invoice_number = %invoice.invoice_number,
            items = items.len(),
            total = %(subtotal + tax),
            "Invoice generated"
        );

        Ok(InvoiceWithItems { invoice, items })
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Order-level fields shared by every new row.
struct OrderHeader {
    status: SaleStatus,
    sale_date: DateTime<Utc>,
    platform_source: Option<String>,
    notes: Option<String>,
}

/// Low-stock warnings, one per product, keeping the latest.
#[derive(Default)]
struct Warnings(BTreeMap<String, StockWarning>);

impl Warnings {
    fn record(&mut self, warning: Option<StockWarning>) {
        if let Some(warning) = warning {
            self.0.insert(warning.product_id.clone(), warning);
        }
    }

    fn into_vec(self) -> Vec<StockWarning> {
        self.0.into_values().collect()
    }
}

fn sale_resource(sale_id: &str) -> String {
    format!("sale {sale_id}")
}

fn clean_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn priced_product<'a>(
    products: &'a BTreeMap<String, Product>,
    product_id: &str,
) -> Result<&'a Product, CoreError> {
    products
        .get(product_id)
        .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))
}

fn line_row(
    account_id: &str,
    customer_id: &str,
    header: &OrderHeader,
    line: &OrderLine,
    product: &Product,
    group_id: Option<&str>,
    now: DateTime<Utc>,
) -> Sale {
    let mut row = Sale {
        id: Uuid::new_v4().to_string(),
        user_id: account_id.to_string(),
        customer_id: customer_id.to_string(),
        product_id: line.product_id.clone(),
        quantity: line.quantity,
        unit_price_cents: line.unit_price_cents,
        discount_cents: line.discount_cents,
        total_cents: 0,
        profit_cents: 0,
        status: header.status,
        sale_date: header.sale_date,
        platform_source: header.platform_source.clone(),
        notes: header.notes.clone(),
        group_id: group_id.map(str::to_string),
        created_at: now,
        updated_at: now,
    };
    reprice_sale(&mut row, product.cost_price_cents);
    row
}

/// Resolves a customer the actor's account owns.
async fn resolve_customer(
    conn: &mut SqliteConnection,
    actor: &Actor,
    customer_id: &str,
) -> LedgerResult<Customer> {
    validate_uuid("customerId", customer_id)?;

    let customer = customer::fetch(conn, customer_id)
        .await?
        .filter(|c| c.user_id == actor.account_id)
        .ok_or_else(|| CoreError::CustomerNotFound(customer_id.to_string()))?;

    Ok(customer)
}

/// Loads the order containing `sale_id`: rows sharing its group id and
/// customer within its account, plus invoices pointing at any of them.
pub(crate) async fn load_group(conn: &mut SqliteConnection, sale_id: &str) -> LedgerResult<SaleGroup> {
    let seed = sale::fetch(conn, sale_id)
        .await?
        .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;

    let members = match seed.group_id.as_deref() {
        Some(group_id) => {
            sale::fetch_group_members(conn, &seed.user_id, &seed.customer_id, group_id).await?
        }
        None => vec![seed.clone()],
    };

    let ids: Vec<String> = members.iter().map(|member| member.id.clone()).collect();
    let invoices = invoice::refs_for_sales(conn, &ids).await?;

    debug!(sale_id = %sale_id, members = members.len(), invoices = invoices.len(), "Loaded order");
    Ok(SaleGroup::new(seed.group_id, members, invoices))
}

/// Writes one invoice item per row.
async fn write_items(
    conn: &mut SqliteConnection,
    invoice_id: &str,
    members: &[Sale],
) -> LedgerResult<Vec<InvoiceItem>> {
    let mut items = Vec::with_capacity(members.len());
    for member in members {
        let item = InvoiceItem {
            id: Uuid::new_v4().to_string(),
            invoice_id: invoice_id.to_string(),
            product_id: member.product_id.clone(),
            quantity: member.quantity,
            unit_price_cents: member.unit_price_cents,
            discount_cents: member.discount_cents,
            line_total_cents: member.total_cents,
        };
        invoice::insert_item(conn, &item).await?;
        items.push(item);
    }
    Ok(items)
}

/// Recomputes amounts, dates and items of every invoice of `group`.
async fn sync_invoices(
    conn: &mut SqliteConnection,
    config: &LedgerConfig,
    group: &SaleGroup,
) -> LedgerResult<Vec<InvoiceWithItems>> {
    if group.invoices.is_empty() {
        return Ok(Vec::new());
    }

    let anchor = group.anchor()?;
    let settings = allocator::ensure_settings(conn, &anchor.user_id, config).await?;
    let subtotal = group.subtotal();
    let tax = subtotal.calculate_tax(settings.tax_rate());
    let amounts = InvoiceAmounts {
        subtotal_cents: subtotal.cents(),
        tax_cents: tax.cents(),
        total_cents: (subtotal + tax).cents(),
        invoice_date: anchor.sale_date,
        due_date: due_date(anchor.sale_date),
    };

    let mut refreshed = Vec::with_capacity(group.invoices.len());
    for linked in &group.invoices {
        invoice::update_amounts(conn, &linked.id, &amounts).await?;
        invoice::delete_items(conn, &linked.id).await?;
        let items = write_items(conn, &linked.id, &group.members).await?;
        let stored = invoice::fetch(conn, &linked.id)
            .await?
            .ok_or_else(|| CoreError::InvoiceNotFound(linked.id.clone()))?;

        info!(invoice_number = %stored.invoice_number, subtotal = %subtotal, "Invoice recomputed");
        refreshed.push(InvoiceWithItems {
            invoice: stored,
            items,
        });
    }

    Ok(refreshed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::ledger::testing::{fixture, Fixture, ACCOUNT};
    use chrono::{Duration, TimeZone};

    fn line(product: &Product, quantity: i64, unit_price_cents: i64) -> OrderLine {
        OrderLine {
            product_id: product.id.clone(),
            quantity,
            unit_price_cents,
            discount_cents: 0,
        }
    }

    fn sale_date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
    }

    /// P1 × 3 @ 10.00 and P2 × 1 @ 5.00 for customer C.
    async fn two_line_order(fx: &Fixture) -> OrderOutcome {
        fx.db
            .orders()
            .create_order(
                &fx.actor,
                NewOrder {
                    customer_id: fx.customer.id.clone(),
                    status: SaleStatus::Unpaid,
                    sale_date: Some(sale_date()),
                    platform_source: Some("market stall".into()),
                    notes: None,
                    lines: vec![line(&fx.p1, 3, 1000), line(&fx.p2, 1, 500)],
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_two_line_order_shares_group_and_takes_stock() {
        let fx = fixture().await;
        let outcome = two_line_order(&fx).await;

        assert_eq!(outcome.sales.len(), 2);
        let group_id = outcome.group_id.clone().unwrap();
        assert!(outcome.sales.iter().all(|s| s.group_id.as_deref() == Some(group_id.as_str())));
        assert_eq!(outcome.sales[0].total_cents, 3000);
        assert_eq!(outcome.sales[1].total_cents, 500);
        assert_eq!(outcome.sales[0].profit_cents, 1200);

        assert_eq!(fx.stock(&fx.p1).await, 17);
        assert_eq!(fx.stock(&fx.p2).await, 11);

        // P2 fell to 11: above the threshold of 10, no warning
        assert!(outcome.stock_warnings.is_empty());

        let view = fx.db.orders().get_order(&fx.actor, &outcome.sales[1].id).await.unwrap();
        assert_eq!(view.state, OrderState::Active);
        assert_eq!(view.sales.len(), 2);
        assert_eq!(view.subtotal_cents, 3500);
    }

    #[tokio::test]
    async fn test_single_line_order_has_no_group() {
        let fx = fixture().await;
        let outcome = fx
            .db
            .orders()
            .create_order(
                &fx.actor,
                NewOrder {
                    customer_id: fx.customer.id.clone(),
                    status: SaleStatus::Paid,
                    sale_date: None,
                    platform_source: None,
                    notes: Some("forged [GROUP:someone-else]".into()),
                    lines: vec![line(&fx.p2, 3, 500)],
                },
            )
            .await
            .unwrap();

        assert!(outcome.group_id.is_none());
        assert_eq!(outcome.sales[0].notes.as_deref(), Some("forged"));
        assert_eq!(outcome.stock_warnings.len(), 1);
        assert_eq!(outcome.stock_warnings[0].remaining, 9);
    }

    #[tokio::test]
    async fn test_insufficient_stock_rejects_whole_order() {
        let fx = fixture().await;

        let err = fx
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
                    lines: vec![line(&fx.p2, 2, 500), line(&fx.p1, 15, 1000), line(&fx.p1, 6, 1000)],
                },
            )
            .await
            .unwrap_err();

        match err {
            LedgerError::Core(CoreError::InsufficientStock {
                product,
                available,
                requested,
                ..
            }) => {
                assert_eq!(product, "Sweet Corn (CORN-01)");
                assert_eq!(available, 20);
                assert_eq!(requested, 21);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        assert_eq!(fx.stock(&fx.p1).await, 20);
        assert_eq!(fx.stock(&fx.p2).await, 12);
        assert!(fx.db.sales().list(ACCOUNT, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generate_invoice_from_group() {
        let fx = fixture().await;
        let order = two_line_order(&fx).await;

        let generated = fx
            .db
            .orders()
            .generate_invoice(&fx.actor, &order.sales[1].id)
            .await
            .unwrap();

        let invoice = &generated.invoice;
        assert_eq!(invoice.invoice_number, "INV-0001");
        assert_eq!(invoice.subtotal_cents, 3500);
        assert_eq!(invoice.tax_cents, 0);
        assert_eq!(invoice.total_cents, 3500);
        assert_eq!(invoice.sale_id.as_deref(), Some(order.sales[0].id.as_str()));
        assert_eq!(invoice.invoice_date, sale_date());
        assert_eq!(invoice.due_date, sale_date() + Duration::days(30));
        assert_eq!(invoice.status, InvoiceStatus::Draft);
        assert_eq!(invoice.payment_terms, "Net 30");

        let totals: Vec<i64> = generated.items.iter().map(|i| i.line_total_cents).collect();
        assert_eq!(totals, vec![3000, 500]);
    }

    #[tokio::test]
    async fn test_second_invoice_names_the_first() {
        let fx = fixture().await;
        let order = two_line_order(&fx).await;
        let orders = fx.db.orders();

        orders.generate_invoice(&fx.actor, &order.sales[0].id).await.unwrap();
        let err = orders
            .generate_invoice(&fx.actor, &order.sales[1].id)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LedgerError::Core(CoreError::AlreadyInvoiced { ref invoice_number, .. })
                if invoice_number == "INV-0001"
        ));
        assert!(err.to_string().contains("INV-0001"));
    }

    #[tokio::test]
    async fn test_status_update_preserves_invoice() {
        let fx = fixture().await;
        let order = two_line_order(&fx).await;
        let orders = fx.db.orders();
        let generated = orders.generate_invoice(&fx.actor, &order.sales[0].id).await.unwrap();

        let updated = orders
            .update_status(
                &fx.actor,
                &order.sales[1].id,
                StatusUpdate {
                    status: SaleStatus::Shipped,
                    platform_source: None,
                    notes: Some("left with neighbour".into()),
                    sale_date: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.len(), 2);
        assert!(updated.iter().all(|s| s.status == SaleStatus::Shipped));
        assert!(updated.iter().all(|s| s.platform_source.as_deref() == Some("market stall")));
        assert!(updated.iter().all(|s| s.notes.as_deref() == Some("left with neighbour")));

        let after = fx
            .db
            .invoicing()
            .get_with_items(&fx.actor, &generated.invoice.id)
            .await
            .unwrap();
        assert_eq!(after.invoice.invoice_number, generated.invoice.invoice_number);
        assert_eq!(after.items, generated.items);
        assert_eq!(after.invoice.subtotal_cents, 3500);
    }

    #[tokio::test]
    async fn test_delete_invoiced_order_is_refused() {
        let fx = fixture().await;
        let order = two_line_order(&fx).await;
        let orders = fx.db.orders();
        let generated = orders.generate_invoice(&fx.actor, &order.sales[0].id).await.unwrap();

        let err = orders.delete_order(&fx.actor, &order.sales[0].id).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Core(CoreError::OrderInvoiced { ref invoice_numbers, .. })
                if invoice_numbers == &vec!["INV-0001".to_string()]
        ));
        assert_eq!(fx.stock(&fx.p1).await, 17);

        fx.db
            .invoicing()
            .delete_invoice(&fx.actor, &generated.invoice.id)
            .await
            .unwrap();
        let deleted = orders.delete_order(&fx.actor, &order.sales[1].id).await.unwrap();

        assert_eq!(deleted.deleted_count, 2);
        assert_eq!(fx.stock(&fx.p1).await, 20);
        assert_eq!(fx.stock(&fx.p2).await, 12);
        assert!(matches!(
            orders.get_order(&fx.actor, &order.sales[0].id).await,
            Err(LedgerError::Core(CoreError::SaleNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_update_order_rebuilds_rows_and_drops_invoice() {
        let fx = fixture().await;
        let order = two_line_order(&fx).await;
        let orders = fx.db.orders();
        orders.generate_invoice(&fx.actor, &order.sales[0].id).await.unwrap();

        let edited = orders
            .update_order(
                &fx.actor,
                &order.sales[1].id,
                OrderEdit {
                    customer_id: fx.customer.id.clone(),
                    status: SaleStatus::Paid,
                    sale_date: sale_date(),
                    platform_source: None,
                    notes: None,
                    lines: vec![line(&fx.p1, 20, 900)],
                },
            )
            .await
            .unwrap();

        assert_eq!(edited.released_invoice_numbers, vec!["INV-0001"]);
        assert!(edited.group_id.is_none());
        assert_eq!(edited.sales.len(), 1);
        // the anchor row survives with its id
        assert_eq!(edited.sales[0].id, order.sales[0].id);
        assert_eq!(edited.sales[0].total_cents, 18_000);

        // all 20 were available once the old 3 came back
        assert_eq!(fx.stock(&fx.p1).await, 0);
        assert_eq!(fx.stock(&fx.p2).await, 12);
        assert_eq!(edited.stock_warnings.len(), 1);

        assert!(fx.db.sales().get_by_id(&order.sales[1].id).await.unwrap().is_none());
        assert!(fx.db.invoicing().list(&fx.actor).await.unwrap().is_empty());

        // the dropped invoice's number is issued again
        assert_eq!(
            fx.db.invoicing().preview_number(&fx.actor).await.unwrap(),
            "INV-0001"
        );
    }

    #[tokio::test]
    async fn test_update_order_shortfall_changes_nothing() {
        let fx = fixture().await;
        let order = two_line_order(&fx).await;
        let orders = fx.db.orders();
        let generated = orders.generate_invoice(&fx.actor, &order.sales[0].id).await.unwrap();

        let err = orders
            .update_order(
                &fx.actor,
                &order.sales[0].id,
                OrderEdit {
                    customer_id: fx.customer.id.clone(),
                    status: SaleStatus::Paid,
                    sale_date: sale_date(),
                    platform_source: None,
                    notes: None,
                    lines: vec![line(&fx.p1, 2, 1000), line(&fx.p2, 50, 500)],
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LedgerError::Core(CoreError::InsufficientStock { available: 12, requested: 50, .. })
        ));
        assert_eq!(fx.stock(&fx.p1).await, 17);
        assert_eq!(fx.stock(&fx.p2).await, 11);
        assert!(fx
            .db
            .invoicing()
            .get_with_items(&fx.actor, &generated.invoice.id)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_update_sale_moves_stock_and_refreshes_invoice() {
        let fx = fixture().await;
        let order = two_line_order(&fx).await;
        let orders = fx.db.orders();
        let generated = orders.generate_invoice(&fx.actor, &order.sales[0].id).await.unwrap();

        let second = &order.sales[1];
        let outcome = orders
            .update_sale(
                &fx.actor,
                &second.id,
                SaleEdit {
                    customer_id: fx.customer.id.clone(),
                    product_id: fx.p2.id.clone(),
                    quantity: 4,
                    unit_price_cents: 500,
                    discount_cents: 50,
                    status: SaleStatus::Unpaid,
                    sale_date: sale_date(),
                    platform_source: Some("market stall".into()),
                    notes: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.sale.total_cents, 1800);
        assert_eq!(outcome.sale.profit_cents, 1000);
        assert_eq!(fx.stock(&fx.p2).await, 8);
        assert_eq!(outcome.stock_warnings.len(), 1);

        assert_eq!(outcome.invoices.len(), 1);
        let refreshed = &outcome.invoices[0];
        assert_eq!(refreshed.invoice.id, generated.invoice.id);
        assert_eq!(refreshed.invoice.invoice_number, "INV-0001");
        assert_eq!(refreshed.invoice.subtotal_cents, 4800);
        assert_eq!(refreshed.items.len(), 2);
        assert_eq!(refreshed.items[1].unit_price_cents, 500);
        assert_eq!(refreshed.items[1].discount_cents, 50);
        assert_eq!(refreshed.items[1].line_total_cents, 1800);
    }

    #[tokio::test]
    async fn test_update_sale_switching_product() {
        let fx = fixture().await;
        let order = fx
            .db
            .orders()
            .create_order(
                &fx.actor,
                NewOrder {
                    customer_id: fx.customer.id.clone(),
                    status: SaleStatus::Unpaid,
                    sale_date: Some(sale_date()),
                    platform_source: None,
                    notes: None,
                    lines: vec![line(&fx.p1, 5, 1000)],
                },
            )
            .await
            .unwrap();

        fx.db
            .orders()
            .update_sale(
                &fx.actor,
                &order.sales[0].id,
                SaleEdit {
                    customer_id: fx.customer.id.clone(),
                    product_id: fx.p2.id.clone(),
                    quantity: 2,
                    unit_price_cents: 500,
                    discount_cents: 0,
                    status: SaleStatus::Unpaid,
                    sale_date: sale_date(),
                    platform_source: None,
                    notes: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(fx.stock(&fx.p1).await, 20);
        assert_eq!(fx.stock(&fx.p2).await, 10);
    }

    #[tokio::test]
    async fn test_grouped_row_cannot_change_customer() {
        let fx = fixture().await;
        let order = two_line_order(&fx).await;
        let other = fx
            .db
            .customers()
            .create(ACCOUNT, "Hilltop Bakery", None, None)
            .await
            .unwrap();

        let err = fx
            .db
            .orders()
            .update_sale(
                &fx.actor,
                &order.sales[0].id,
                SaleEdit {
                    customer_id: other.id,
                    product_id: fx.p1.id.clone(),
                    quantity: 3,
                    unit_price_cents: 1000,
                    discount_cents: 0,
                    status: SaleStatus::Unpaid,
                    sale_date: sale_date(),
                    platform_source: None,
                    notes: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LedgerError::Core(CoreError::Validation(ValidationError::Immutable { .. }))
        ));
    }

    #[tokio::test]
    async fn test_other_accounts_are_forbidden() {
        let fx = fixture().await;
        let order = two_line_order(&fx).await;
        let stranger = Actor::owner("farm-2");

        let err = fx
            .db
            .orders()
            .delete_order(&stranger, &order.sales[0].id)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Core(CoreError::Forbidden { .. })));
        assert_eq!(fx.stock(&fx.p1).await, 17);
    }

    #[tokio::test]
    async fn test_account_member_acts_for_owner() {
        let fx = fixture().await;
        let order = two_line_order(&fx).await;

        fx.db.accounts().add_member("alice", ACCOUNT).await.unwrap();
        let alice = fx.db.accounts().resolve("alice").await.unwrap();

        let generated = fx
            .db
            .orders()
            .generate_invoice(&alice, &order.sales[0].id)
            .await
            .unwrap();
        assert_eq!(generated.invoice.user_id, ACCOUNT);
        assert_eq!(generated.invoice.invoice_number, "INV-0001");
    }

    #[tokio::test]
    async fn test_invoice_applies_account_tax_rate() {
        let fx = fixture().await;
        let order = two_line_order(&fx).await;

        fx.db.numbering().peek_next_number(ACCOUNT).await.unwrap();
        fx.db
            .settings()
            .update(
                ACCOUNT,
                &crate::repository::settings::SettingsUpdate {
                    invoice_prefix: "FARM".into(),
                    currency: "eur".into(),
                    tax_rate_bps: 825,
                    payment_terms: "Net 15".into(),
                    bank_details: None,
                },
            )
            .await
            .unwrap();

        let generated = fx
            .db
            .orders()
            .generate_invoice(&fx.actor, &order.sales[0].id)
            .await
            .unwrap();
        assert_eq!(generated.invoice.invoice_number, "FARM-0001");
        assert_eq!(generated.invoice.tax_cents, 289);
        assert_eq!(generated.invoice.total_cents, 3789);
        assert_eq!(generated.invoice.currency, "EUR");
        assert_eq!(generated.invoice.payment_terms, "Net 15");
    }

    #[tokio::test]
    async fn test_amount_refresh_recomputes_linked_invoice() {
        let fx = fixture().await;
        let order = two_line_order(&fx).await;
        let orders = fx.db.orders();

        let untouched = orders
            .on_sale_amounts_changed(&fx.actor, &order.sales[1].id)
            .await
            .unwrap();
        assert!(untouched.is_empty());

        let generated = orders.generate_invoice(&fx.actor, &order.sales[0].id).await.unwrap();
        assert_eq!(generated.invoice.tax_cents, 0);

        fx.db
            .settings()
            .update(
                ACCOUNT,
                &crate::repository::settings::SettingsUpdate {
                    invoice_prefix: "INV".into(),
                    currency: "USD".into(),
                    tax_rate_bps: 1000,
                    payment_terms: "Net 30".into(),
                    bank_details: None,
                },
            )
            .await
            .unwrap();

        let refreshed = orders
            .on_sale_amounts_changed(&fx.actor, &order.sales[1].id)
            .await
            .unwrap();
        assert_eq!(refreshed.len(), 1);
        let invoice = &refreshed[0].invoice;
        assert_eq!(invoice.id, generated.invoice.id);
        assert_eq!(invoice.invoice_number, "INV-0001");
        assert_eq!(invoice.subtotal_cents, 3500);
        assert_eq!(invoice.tax_cents, 350);
        assert_eq!(invoice.total_cents, 3850);
        assert_eq!(invoice.due_date, sale_date() + Duration::days(30));
        assert_eq!(refreshed[0].items.len(), 2);

        let err = orders
            .on_sale_amounts_changed(&Actor::owner("farm-2"), &order.sales[0].id)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Core(CoreError::Forbidden { .. })));
    }

    #[tokio::test]
    async fn test_editing_second_row_moves_whole_order_header() {
        let fx = fixture().await;
        let order = two_line_order(&fx).await;
        let orders = fx.db.orders();
        let generated = orders.generate_invoice(&fx.actor, &order.sales[0].id).await.unwrap();
        let moved_to = sale_date() + Duration::days(2);

        let outcome = orders
            .update_sale(
                &fx.actor,
                &order.sales[1].id,
                SaleEdit {
                    customer_id: fx.customer.id.clone(),
                    product_id: fx.p2.id.clone(),
                    quantity: 1,
                    unit_price_cents: 500,
                    discount_cents: 0,
                    status: SaleStatus::Shipped,
                    sale_date: moved_to,
                    platform_source: Some("farm gate".into()),
                    notes: Some("jar wrapped".into()),
                },
            )
            .await
            .unwrap();

        let view = orders.get_order(&fx.actor, &order.sales[0].id).await.unwrap();
        assert_eq!(view.sales.len(), 2);
        for sale in &view.sales {
            assert_eq!(sale.status, SaleStatus::Shipped);
            assert_eq!(sale.sale_date, moved_to);
            assert_eq!(sale.platform_source.as_deref(), Some("farm gate"));
        }
        assert_eq!(view.sales[0].notes, None);
        assert_eq!(view.sales[1].notes.as_deref(), Some("jar wrapped"));

        assert_eq!(outcome.invoices.len(), 1);
        let refreshed = &outcome.invoices[0].invoice;
        assert_eq!(refreshed.id, generated.invoice.id);
        assert_eq!(refreshed.invoice_date, moved_to);
        assert_eq!(refreshed.due_date, moved_to + Duration::days(30));
        assert_eq!(refreshed.subtotal_cents, 3500);
    }

    #[tokio::test]
    async fn test_oversized_price_is_rejected_before_any_write() {
        let fx = fixture().await;

        let err = fx
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
                    lines: vec![line(&fx.p1, 3, 4_000_000_000_000_000_000)],
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LedgerError::Core(CoreError::Validation(ValidationError::OutOfRange { ref field, .. }))
                if field == "unitPrice"
        ));
        assert_eq!(fx.stock(&fx.p1).await, 20);
        assert!(fx.db.sales().list(ACCOUNT, 10).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_share_a_file_database() {
        use crate::pool::{Database, DbConfig};
        use crate::repository::product::NewProduct;

        let path = std::env::temp_dir().join(format!("harvest-ledger-{}.db", Uuid::new_v4()));
        let db = Database::new(DbConfig::new(path.clone()).max_connections(8))
            .await
            .unwrap();
        let product = db
            .products()
            .create(
                ACCOUNT,
                &NewProduct {
                    sku: "EGGS-12".into(),
                    name: "Free Range Eggs".into(),
                    cost_price_cents: 250,
                    selling_price_cents: 450,
                    stock: 1000,
                },
            )
            .await
            .unwrap();
        let customer = db
            .customers()
            .create(ACCOUNT, "Greenway Grocers", None, None)
            .await
            .unwrap();
        let actor = Actor::owner(ACCOUNT);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let (db, actor) = (db.clone(), actor.clone());
            let order = NewOrder {
                customer_id: customer.id.clone(),
                status: SaleStatus::Unpaid,
                sale_date: None,
                platform_source: None,
                notes: None,
                lines: vec![line(&product, 1, 450)],
            };
            handles.push(tokio::spawn(async move {
                db.orders().create_order(&actor, order).await
            }));
        }

        let mut sale_ids = Vec::new();
        for handle in handles {
            let outcome = handle.await.unwrap().unwrap();
            sale_ids.push(outcome.sales[0].id.clone());
        }
        let stored = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.stock, 984);

        let mut handles = Vec::new();
        for sale_id in sale_ids {
            let (db, actor) = (db.clone(), actor.clone());
            handles.push(tokio::spawn(async move {
                db.orders().generate_invoice(&actor, &sale_id).await
            }));
        }

        let mut numbers = Vec::new();
        for handle in handles {
            numbers.push(handle.await.unwrap().unwrap().invoice.invoice_number);
        }
        numbers.sort();
        numbers.dedup();
        assert_eq!(numbers.len(), 16);

        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
        }
    }
}
