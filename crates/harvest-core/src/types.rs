//! # Domain Types
//!
//! Core domain types used throughout Harvest Ledger.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │    Invoice      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  product_id     │   │  sale_id (anchor)│      │
//! │  │  sku (unique)   │   │  customer_id    │──►│  invoice_number │       │
//! │  │  stock          │   │  group_id ──┐   │   │  subtotal/total │       │
//! │  └─────────────────┘   └─────────────┼───┘   └────────┬────────┘       │
//! │                                      │                │                 │
//! │                        Sales sharing a group_id       ▼                 │
//! │                        form ONE logical order    ┌─────────────┐       │
//! │                                                  │ InvoiceItem │ × N   │
//! │  ┌──────────────────┐  ┌──────────────────────┐  └─────────────┘       │
//! │  │ BusinessSettings │  │ReusableInvoiceNumber │                        │
//! │  │  invoice_prefix  │  │  FIFO queue of freed │                        │
//! │  │  next counter    │  │  invoice numbers     │                        │
//! │  └──────────────────┘  └──────────────────────┘                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `user_id` on every record is the owning **business account**, not the
//! login identity. Several identities may act on one account (see [`Actor`]).
//!
//! All monetary columns are integer cents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 825 bps = 8.25%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Product
// =============================================================================

/// Whether a product can still be sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[default]
    Active,
    Inactive,
}

/// A product in the account's catalog.
///
/// `stock` is never written from request bodies; it moves only through the
/// stock ledger's atomic adjustment.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    pub id: String,
    /// Owning business account.
    pub user_id: String,
    /// Stock Keeping Unit, unique.
    pub sku: String,
    pub name: String,
    pub cost_price_cents: i64,
    pub selling_price_cents: i64,
    /// On-hand quantity, never negative.
    pub stock: i64,
    pub status: ProductStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Unit cost as Money.
    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_cents(self.cost_price_cents)
    }

    /// Display label used in error messages and warnings: `Name (SKU)`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.sku)
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer of the business account.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub user_id: String,
    pub name: String,
    /// Unique when present.
    pub email: Option<String>,
    pub phone: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sale Status
// =============================================================================

/// Workflow state of an order line.
///
/// All rows of one order share the same status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    #[default]
    Unpaid,
    Paid,
    PendingShipment,
    Shipped,
    Completed,
}

impl SaleStatus {
    pub const ALL: [SaleStatus; 5] = [
        SaleStatus::Unpaid,
        SaleStatus::Paid,
        SaleStatus::PendingShipment,
        SaleStatus::Shipped,
        SaleStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Unpaid => "unpaid",
            SaleStatus::Paid => "paid",
            SaleStatus::PendingShipment => "pending_shipment",
            SaleStatus::Shipped => "shipped",
            SaleStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SaleStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SaleStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: SaleStatus::ALL.iter().map(|s| s.as_str().to_string()).collect(),
            })
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A single line of an order.
///
/// `total_cents` and `profit_cents` are derived from quantity, unit price,
/// discount and the product's cost (see [`crate::pricing`]). They are never
/// set independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Sale {
    pub id: String,
    /// Owning business account.
    pub user_id: String,
    pub customer_id: String,
    pub product_id: String,
    pub quantity: i64,
    /// Gross unit price.
    pub unit_price_cents: i64,
    /// Per-unit discount, `0 <= discount <= unit price`.
    pub discount_cents: i64,
    /// `(unit − discount) × quantity`
    pub total_cents: i64,
    /// `(unit − discount − cost) × quantity`
    pub profit_cents: i64,
    pub status: SaleStatus,
    #[ts(as = "String")]
    pub sale_date: DateTime<Utc>,
    pub platform_source: Option<String>,
    pub notes: Option<String>,
    /// Shared by every row of a multi-line order; `None` for single-line orders.
    pub group_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    /// Net line total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// True when the row belongs to a multi-line order.
    #[inline]
    pub fn is_grouped(&self) -> bool {
        self.group_id.is_some()
    }
}

// =============================================================================
// Order Line (input)
// =============================================================================

/// One product line of a submitted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    #[serde(default)]
    pub discount_cents: i64,
}

// =============================================================================
// Invoice Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    /// Allowed invoice workflow moves.
    ///
    /// ```text
    /// draft ──► sent ──► paid
    ///             │        ▲
    ///             ▼        │
    ///          overdue ────┘
    ///
    /// draft | sent | overdue ──► cancelled
    /// ```
    pub fn can_transition_to(&self, next: InvoiceStatus) -> bool {
        use InvoiceStatus::*;
        matches!(
            (self, next),
            (Draft, Sent)
                | (Sent, Paid)
                | (Sent, Overdue)
                | (Overdue, Paid)
                | (Draft, Cancelled)
                | (Sent, Cancelled)
                | (Overdue, Cancelled)
        )
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// An invoice generated from one order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    pub user_id: String,
    pub customer_id: String,
    /// First row of the invoiced order.
    pub sale_id: Option<String>,
    /// Unique per business account.
    pub invoice_number: String,
    #[ts(as = "String")]
    pub invoice_date: DateTime<Utc>,
    /// Always `invoice_date + 30 days`.
    #[ts(as = "String")]
    pub due_date: DateTime<Utc>,
    pub status: InvoiceStatus,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub currency: String,
    pub payment_terms: String,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// One invoice line per sale row of the invoiced order.
///
/// Same convention as [`Sale`]: gross unit price, per-unit discount,
/// derived net line total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InvoiceItem {
    pub id: String,
    pub invoice_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub discount_cents: i64,
    pub line_total_cents: i64,
}

/// Invoice plus its lines, as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InvoiceWithItems {
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
}

// =============================================================================
// Business Settings
// =============================================================================

/// Per-account settings; doubles as the invoice counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BusinessSettings {
    /// The business account (primary settings owner).
    pub user_id: String,
    pub invoice_prefix: String,
    /// Next sequential number to mint when the reuse queue is empty.
    pub next_invoice_number: i64,
    pub currency: String,
    pub tax_rate_bps: i64,
    pub payment_terms: String,
    pub bank_details: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl BusinessSettings {
    /// Account tax rate; out-of-range stored values clamp to 0..=10000 bps.
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps.clamp(0, 10_000) as u32)
    }
}

/// A freed invoice number waiting to be reissued (FIFO).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReusableInvoiceNumber {
    pub id: i64,
    pub user_id: String,
    pub invoice_number: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Actor
// =============================================================================

/// An authenticated identity acting on a business account.
///
/// Identity → account resolution happens at the boundary; the core only
/// compares `account_id` with a record's `user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub identity_id: String,
    pub account_id: String,
}

impl Actor {
    pub fn new(identity_id: impl Into<String>, account_id: impl Into<String>) -> Self {
        Actor {
            identity_id: identity_id.into(),
            account_id: account_id.into(),
        }
    }

    /// An identity that is its own account.
    pub fn owner(account_id: impl Into<String>) -> Self {
        let account_id = account_id.into();
        Actor {
            identity_id: account_id.clone(),
            account_id,
        }
    }

    /// True when the actor may modify records owned by `account_id`.
    #[inline]
    pub fn can_modify(&self, account_id: &str) -> bool {
        self.account_id == account_id
    }
}

// =============================================================================
// Stock Warning
// =============================================================================

/// Advisory signal that a product dropped to or below the low-stock threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockWarning {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub remaining: i64,
    pub threshold: i64,
}

impl StockWarning {
    pub fn message(&self) -> String {
        format!("Low stock: {} ({}) has {} left", self.name, self.sku, self.remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sale_status_round_trip_names() {
        assert_eq!("pending_shipment".parse::<SaleStatus>().unwrap(), SaleStatus::PendingShipment);
        assert_eq!(SaleStatus::Shipped.to_string(), "shipped");
        assert_eq!(SaleStatus::default(), SaleStatus::Unpaid);

        let err = "lost".parse::<SaleStatus>().unwrap_err();
        assert_eq!(err.field(), "status");
    }

    #[test]
    fn test_sale_status_serializes_snake_case() {
        let json = serde_json::to_string(&SaleStatus::PendingShipment).unwrap();
        assert_eq!(json, "\"pending_shipment\"");
    }

    #[test]
    fn test_invoice_transitions() {
        assert!(InvoiceStatus::Draft.can_transition_to(InvoiceStatus::Sent));
        assert!(InvoiceStatus::Sent.can_transition_to(InvoiceStatus::Overdue));
        assert!(InvoiceStatus::Overdue.can_transition_to(InvoiceStatus::Paid));
        assert!(!InvoiceStatus::Paid.can_transition_to(InvoiceStatus::Cancelled));
        assert!(!InvoiceStatus::Cancelled.can_transition_to(InvoiceStatus::Draft));
        assert!(!InvoiceStatus::Draft.can_transition_to(InvoiceStatus::Draft));
    }

    #[test]
    fn test_actor_account_check() {
        let member = Actor::new("alice", "farm-1");
        assert!(member.can_modify("farm-1"));
        assert!(!member.can_modify("farm-2"));

        let owner = Actor::owner("farm-1");
        assert_eq!(owner.identity_id, "farm-1");
    }

    #[test]
    fn test_settings_tax_rate_clamps() {
        let now = Utc::now();
        let mut settings = BusinessSettings {
            user_id: "farm-1".into(),
            invoice_prefix: "INV".into(),
            next_invoice_number: 1,
            currency: "USD".into(),
            tax_rate_bps: 825,
            payment_terms: "Net 30".into(),
            bank_details: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(settings.tax_rate().bps(), 825);
        settings.tax_rate_bps = -4;
        assert!(settings.tax_rate().is_zero());
    }

    #[test]
    fn test_stock_warning_message() {
        let warning = StockWarning {
            product_id: "p1".into(),
            sku: "CORN-01".into(),
            name: "Sweet Corn".into(),
            remaining: 4,
            threshold: 10,
        };
        assert_eq!(warning.message(), "Low stock: Sweet Corn (CORN-01) has 4 left");
    }
}
