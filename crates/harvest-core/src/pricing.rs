//! # Line Pricing
//!
//! Derived amounts for sale rows and invoice items.
//!
//! ```text
//! net unit  = unit_price − discount
//! total     = net unit × quantity
//! profit    = (net unit − product cost) × quantity
//! ```
//!
//! Totals and profit are outputs only. Whenever quantity, unit price,
//! discount or product changes, the row is repriced from these formulas;
//! request bodies never carry them.

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::Sale;

/// Derived amounts for one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePricing {
    pub net_unit: Money,
    pub total: Money,
    pub profit: Money,
}

/// Prices a line from its inputs and the product's cost.
///
/// ```rust
/// use harvest_core::pricing::price_line;
///
/// // 3 × 10.00, 1.00 off each, cost 6.00
/// let line = price_line(3, 1000, 100, 600);
/// assert_eq!(line.total.cents(), 2700);
/// assert_eq!(line.profit.cents(), 900);
/// ```
pub fn price_line(
    quantity: i64,
    unit_price_cents: i64,
    discount_cents: i64,
    cost_price_cents: i64,
) -> LinePricing {
    let net_unit = Money::from_cents(unit_price_cents - discount_cents);
    let total = net_unit.multiply_quantity(quantity);
    let profit = (net_unit - Money::from_cents(cost_price_cents)).multiply_quantity(quantity);

    LinePricing {
        net_unit,
        total,
        profit,
    }
}

/// Recomputes `total_cents` and `profit_cents` of a sale row in place.
pub fn reprice_sale(sale: &mut Sale, cost_price_cents: i64) {
    let line = price_line(
        sale.quantity,
        sale.unit_price_cents,
        sale.discount_cents,
        cost_price_cents,
    );
    sale.total_cents = line.total.cents();
    sale.profit_cents = line.profit.cents();
}
