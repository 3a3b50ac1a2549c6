//! Row types for the order tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CustomerId, Money, OrderId, OrderStatus, ProductId, ReviewId};

/// A product row as seen by the order workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub product_id: ProductId,
    pub description: Option<String>,
    pub unit_price: Money,
    pub stock_quantity: i32,
}

impl ProductRecord {
    /// Creates a product row without a description.
    pub fn new(product_id: impl Into<ProductId>, unit_price: Money, stock_quantity: i32) -> Self {
        Self {
            product_id: product_id.into(),
            description: None,
            unit_price,
            stock_quantity,
        }
    }
}

/// An order header.
///
/// `total_amount` and `total_items` are computed once at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub invoice_no: Option<String>,
    pub status: OrderStatus,
    pub total_amount: Money,
    pub total_items: i32,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    /// When the order was handed to the carrier.
    pub delivered_carrier_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub estimated_delivery_at: Option<DateTime<Utc>>,
}

/// One line of an order. `order_item_id` is the 1-based position in the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemRecord {
    pub order_id: OrderId,
    pub order_item_id: i32,
    pub product_id: ProductId,
    pub quantity: i32,
    pub unit_price: Money,
    pub line_total: Money,
}

/// A payment keyed by `(order_id, payment_sequential)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub order_id: OrderId,
    pub payment_sequential: i32,
    pub payment_type: String,
    pub payment_installments: i32,
    pub payment_value: Money,
}

/// A review to insert. The store assigns the creation date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    pub review_id: ReviewId,
    pub order_id: OrderId,
    pub review_score: i16,
    pub review_comment_title: Option<String>,
    pub review_comment_message: Option<String>,
}

/// A persisted review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub review_id: ReviewId,
    pub order_id: OrderId,
    pub review_score: i16,
    pub review_comment_title: Option<String>,
    pub review_comment_message: Option<String>,
    pub review_creation_date: DateTime<Utc>,
    pub review_answer_timestamp: Option<DateTime<Utc>>,
}

/// Row counts removed from the child tables of an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedDependents {
    pub items: u64,
    pub payments: u64,
    pub reviews: u64,
}
