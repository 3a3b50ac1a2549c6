//! Values returned by the lifecycle manager.

use common::{Money, ProductId};
use store::{OrderItemRecord, OrderRecord, PaymentRecord, RemovedDependents, ReviewRecord};

/// An order header with all of its dependent rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDetails {
    pub order: OrderRecord,
    pub items: Vec<OrderItemRecord>,
    pub payments: Vec<PaymentRecord>,
    pub reviews: Vec<ReviewRecord>,
}

impl OrderDetails {
    /// Sum of the item line totals, or None on overflow.
    pub fn items_total(&self) -> Option<Money> {
        self.items
            .iter()
            .try_fold(Money::zero(), |total, item| total.checked_add(item.line_total))
    }
}

/// Stock given back to one product by a cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredStock {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Outcome of a cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelledOrder {
    /// The deleted order header.
    pub order: OrderRecord,
    pub restored_stock: Vec<RestoredStock>,
    pub removed: RemovedDependents,
}

/// Outcome of an administrative deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedOrder {
    /// The deleted order header.
    pub order: OrderRecord,
    pub removed: RemovedDependents,
}
