//! Stock check and totals for a new order.

use std::collections::BTreeMap;

use common::{Money, ProductId};
use store::ProductRecord;

use super::OrderLine;
use crate::error::{OrderError, ValidationError};

/// A requested line with its effective price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PricedLine {
    pub product_id: ProductId,
    pub quantity: i32,
    pub unit_price: Money,
    pub line_total: Money,
}

/// Lines, totals and per-product quantities for a new order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PricedOrder {
    pub lines: Vec<PricedLine>,
    pub total_amount: Money,
    pub total_items: i32,
    /// Total quantity to take from each product's stock.
    pub reserved: BTreeMap<ProductId, i32>,
}

/// Prices `lines` against the locked `products` and checks stock.
///
/// Lines for the same product are checked against its stock cumulatively.
pub(crate) fn price_order(
    lines: &[OrderLine],
    products: &BTreeMap<ProductId, ProductRecord>,
) -> Result<PricedOrder, OrderError> {
    let mut priced = Vec::with_capacity(lines.len());
    let mut reserved: BTreeMap<ProductId, i32> = BTreeMap::new();
    let mut total_amount = Money::zero();
    let mut total_items: i32 = 0;

    for line in lines {
        let product = products
            .get(&line.product_id)
            .ok_or_else(|| OrderError::ProductNotFound(line.product_id.clone()))?;

        let requested = reserved.entry(line.product_id.clone()).or_insert(0);
        let cumulative = i64::from(*requested) + i64::from(line.quantity);
        if cumulative > i64::from(product.stock_quantity) {
            return Err(OrderError::InsufficientStock {
                product_id: line.product_id.clone(),
                requested: cumulative,
                available: product.stock_quantity,
            });
        }
        // Bounded by stock_quantity, which is an i32
        *requested = cumulative as i32;

        let unit_price = line.unit_price.unwrap_or(product.unit_price);
        let line_total = unit_price
            .checked_mul(line.quantity)
            .ok_or(ValidationError::TotalsOverflow)?;
        total_amount = total_amount
            .checked_add(line_total)
            .ok_or(ValidationError::TotalsOverflow)?;
        total_items = total_items
            .checked_add(line.quantity)
            .ok_or(ValidationError::TotalsOverflow)?;

        priced.push(PricedLine {
            product_id: line.product_id.clone(),
            quantity: line.quantity,
            unit_price,
            line_total,
        });
    }

    Ok(PricedOrder {
        lines: priced,
        total_amount,
        total_items,
        reserved,
    })
}
