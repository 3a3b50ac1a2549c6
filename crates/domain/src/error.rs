//! Domain error types.

use common::{OrderId, OrderStatus, ProductId};
use store::StoreError;
use thiserror::Error;

/// Malformed or missing input, detected before any transaction opens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Customer ID is required.
    #[error("Customer ID is required")]
    CustomerIdRequired,

    /// Order has no items.
    #[error("At least one item is required")]
    NoItems,

    /// An item has no product.
    #[error("Item {line}: product ID is required")]
    ProductIdRequired { line: usize },

    /// Invalid quantity.
    #[error("Item {line}: invalid quantity {quantity} (must be greater than 0)")]
    InvalidQuantity { line: usize, quantity: i32 },

    /// Invalid price override.
    #[error("Item {line}: invalid unit price {cents} cents (must not be negative)")]
    InvalidPrice { line: usize, cents: i64 },

    /// A payment has no type.
    #[error("Payment {sequential}: payment type is required")]
    PaymentTypeRequired { sequential: i32 },

    /// A payment has fewer than one installment.
    #[error("Payment {sequential}: invalid installments {installments} (must be at least 1)")]
    InvalidInstallments { sequential: i32, installments: i32 },

    /// A payment has a negative value.
    #[error("Payment {sequential}: value must not be negative")]
    NegativePaymentValue { sequential: i32 },

    /// Review score outside 1..=5.
    #[error("Invalid review score: {score} (must be between 1 and 5)")]
    InvalidReviewScore { score: i16 },

    /// New orders must start as pending or created.
    #[error("Orders cannot be created with status {0}")]
    InvalidInitialStatus(OrderStatus),

    /// An invoice number was given but is blank.
    #[error("Invoice number must not be blank")]
    InvoiceNoBlank,

    /// Totals don't fit the stored column types.
    #[error("Order totals overflow")]
    TotalsOverflow,
}

/// Errors that can occur during order lifecycle operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The request was rejected before reaching the store.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A referenced product does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Requested quantity exceeds available stock.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: i64,
        available: i32,
    },

    /// The status change is not allowed from the current status.
    #[error("Invalid status transition: cannot move from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    /// An error occurred in the store.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl OrderError {
    /// Short machine-readable name, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            OrderError::Validation(_) => "validation",
            OrderError::ProductNotFound(_) => "product_not_found",
            OrderError::OrderNotFound(_) => "order_not_found",
            OrderError::InsufficientStock { .. } => "insufficient_stock",
            OrderError::InvalidStatusTransition { .. } => "invalid_status_transition",
            OrderError::Storage(_) => "storage",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_convert_into_order_errors() {
        let err: OrderError = ValidationError::NoItems.into();
        assert!(matches!(err, OrderError::Validation(ValidationError::NoItems)));
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn insufficient_stock_message_names_the_product() {
        let err = OrderError::InsufficientStock {
            product_id: ProductId::new("P-1"),
            requested: 3,
            available: 2,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product P-1: requested 3, available 2"
        );
    }
}
