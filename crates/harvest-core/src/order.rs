//! # Orders and Their Lifecycle
//!
//! A [`SaleGroup`] is one logical order: every sale row sharing a group id
//! (or a single ungrouped row) plus any invoices pointing at those rows.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   create_order                 generate_invoice                         │
//! │  ─────────────►  ┌────────┐  ───────────────────►  ┌──────────┐        │
//! │                  │ Active │                         │ Invoiced │        │
//! │                  └───┬────┘  ◄───────────────────   └────┬─────┘        │
//! │                      │          delete_invoice /         │              │
//! │                      │          update_order             │ delete_order │
//! │        delete_order  │                                   │  (rejected)  │
//! │                      ▼                                   ✗              │
//! │                ┌───────────┐                                            │
//! │                │ Dissolved │   no rows left                             │
//! │                └───────────┘                                            │
//! │                                                                         │
//! │   update_status: Active → Active, Invoiced → Invoiced (invoice kept)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The state is derived from what storage returns; the guard methods here
//! are called by every transition in `harvest_db::ledger::orders` before
//! anything is written.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{OrderLine, Sale};

/// The part of an invoice the order lifecycle cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InvoiceRef {
    pub id: String,
    pub invoice_number: String,
    pub sale_id: Option<String>,
}

/// Lifecycle state of one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "state", rename_all = "snake_case")]
#[ts(export)]
pub enum OrderState {
    Active,
    Invoiced {
        #[serde(rename = "invoiceId")]
        invoice_id: String,
        #[serde(rename = "invoiceNumber")]
        invoice_number: String,
    },
    Dissolved,
}

/// One logical order as loaded from storage.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleGroup {
    /// `None` for single-line orders.
    pub group_id: Option<String>,
    /// Rows ordered by creation; the first is the anchor.
    pub members: Vec<Sale>,
    /// Invoices referencing any member.
    pub invoices: Vec<InvoiceRef>,
}

impl SaleGroup {
    pub fn new(group_id: Option<String>, members: Vec<Sale>, invoices: Vec<InvoiceRef>) -> Self {
        SaleGroup {
            group_id,
            members,
            invoices,
        }
    }

    pub fn state(&self) -> OrderState {
        if self.members.is_empty() {
            return OrderState::Dissolved;
        }
        match self.invoices.first() {
            Some(invoice) => OrderState::Invoiced {
                invoice_id: invoice.id.clone(),
                invoice_number: invoice.invoice_number.clone(),
            },
            None => OrderState::Active,
        }
    }

    /// First row of the order. Invoices and in-place edits hang off it.
    pub fn anchor(&self) -> CoreResult<&Sale> {
        self.members
            .first()
            .ok_or_else(|| CoreError::OrderDissolved(self.reference()))
    }

    /// Identifier used in error messages: anchor id, else group id.
    pub fn reference(&self) -> String {
        self.members
            .first()
            .map(|sale| sale.id.clone())
            .or_else(|| self.group_id.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, sale_id: &str) -> bool {
        self.members.iter().any(|sale| sale.id == sale_id)
    }

    /// Sum of member totals.
    pub fn subtotal(&self) -> Money {
        self.members.iter().map(Sale::total).sum()
    }

    /// Quantity per product that deleting every member would put back on the shelf.
    pub fn returned_stock(&self) -> BTreeMap<String, i64> {
        let mut returned = BTreeMap::new();
        for sale in &self.members {
            *returned.entry(sale.product_id.clone()).or_insert(0) += sale.quantity;
        }
        returned
    }

    pub fn invoice_numbers(&self) -> Vec<String> {
        self.invoices
            .iter()
            .map(|invoice| invoice.invoice_number.clone())
            .collect()
    }

    /// Guard for `delete_order`: invoiced orders are never deleted implicitly.
    pub fn ensure_deletable(&self) -> CoreResult<()> {
        match self.state() {
            OrderState::Active => Ok(()),
            OrderState::Invoiced { .. } => Err(CoreError::OrderInvoiced {
                sale_id: self.reference(),
                invoice_numbers: self.invoice_numbers(),
            }),
            OrderState::Dissolved => Err(CoreError::OrderDissolved(self.reference())),
        }
    }

    /// Guard for `generate_invoice`: at most one invoice per order.
    pub fn ensure_invoiceable(&self) -> CoreResult<()> {
        match self.state() {
            OrderState::Active => Ok(()),
            OrderState::Invoiced { invoice_number, .. } => Err(CoreError::AlreadyInvoiced {
                sale_id: self.reference(),
                invoice_number,
            }),
            OrderState::Dissolved => Err(CoreError::OrderDissolved(self.reference())),
        }
    }
}

/// Total quantity requested per product across order lines.
///
/// Two lines for the same product must be checked against stock together.
pub fn requested_quantities(lines: &[OrderLine]) -> BTreeMap<String, i64> {
    let mut requested = BTreeMap::new();
    for line in lines {
        *requested.entry(line.product_id.clone()).or_insert(0) += line.quantity;
    }
    requested
}

/// True when an order of `line_count` lines needs a group id.
#[inline]
pub fn needs_group(line_count: usize) -> bool {
    line_count > 1
}
