//! Order commands.

use chrono::{DateTime, Utc};
use common::{CustomerId, Money, OrderId, OrderStatus, ProductId};

use crate::error::ValidationError;

/// One requested line of a new order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    /// The product ordered.
    pub product_id: ProductId,

    /// Quantity ordered.
    pub quantity: i32,

    /// Caller-supplied unit price. When None, the product's current price is used.
    pub unit_price: Option<Money>,
}

impl OrderLine {
    /// Creates a line priced from the product row.
    pub fn new(product_id: impl Into<ProductId>, quantity: i32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            unit_price: None,
        }
    }

    /// Creates a line with an explicit unit price.
    pub fn with_price(product_id: impl Into<ProductId>, quantity: i32, unit_price: Money) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            unit_price: Some(unit_price),
        }
    }
}

/// A payment recorded together with a new order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentLine {
    /// Caller-assigned sequence number, unique per order.
    pub payment_sequential: i32,
    pub payment_type: String,
    pub payment_installments: i32,
    pub payment_value: Money,
}

impl PaymentLine {
    /// Creates a new payment line.
    pub fn new(
        payment_sequential: i32,
        payment_type: impl Into<String>,
        payment_installments: i32,
        payment_value: Money,
    ) -> Self {
        Self {
            payment_sequential,
            payment_type: payment_type.into(),
            payment_installments,
            payment_value,
        }
    }
}

/// A review recorded together with a new order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewLine {
    pub review_score: i16,
    pub review_comment_title: Option<String>,
    pub review_comment_message: Option<String>,
}

impl ReviewLine {
    /// Creates a review with a score and no comment.
    pub fn new(review_score: i16) -> Self {
        Self {
            review_score,
            review_comment_title: None,
            review_comment_message: None,
        }
    }

    /// Adds a comment title and message.
    pub fn with_comment(
        mut self,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.review_comment_title = Some(title.into());
        self.review_comment_message = Some(message.into());
        self
    }
}

/// Command to create an order with its items, payments and reviews.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    /// The customer placing the order.
    pub customer_id: CustomerId,

    /// Optional invoice number.
    pub invoice_no: Option<String>,

    /// Initial status. Defaults to pending.
    pub status: Option<OrderStatus>,

    /// Optional estimated delivery date.
    pub estimated_delivery_at: Option<DateTime<Utc>>,

    /// Requested lines, in order. Must not be empty.
    pub items: Vec<OrderLine>,

    pub payments: Vec<PaymentLine>,
    pub reviews: Vec<ReviewLine>,
}

impl CreateOrder {
    /// Creates a new CreateOrder command.
    pub fn new(customer_id: impl Into<CustomerId>, items: Vec<OrderLine>) -> Self {
        Self {
            customer_id: customer_id.into(),
            invoice_no: None,
            status: None,
            estimated_delivery_at: None,
            items,
            payments: Vec::new(),
            reviews: Vec::new(),
        }
    }

    pub fn with_invoice_no(mut self, invoice_no: impl Into<String>) -> Self {
        self.invoice_no = Some(invoice_no.into());
        self
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_estimated_delivery(mut self, at: DateTime<Utc>) -> Self {
        self.estimated_delivery_at = Some(at);
        self
    }

    pub fn with_payment(mut self, payment: PaymentLine) -> Self {
        self.payments.push(payment);
        self
    }

    pub fn with_review(mut self, review: ReviewLine) -> Self {
        self.reviews.push(review);
        self
    }

    /// Returns the status the order will be created with.
    pub fn initial_status(&self) -> OrderStatus {
        self.status.unwrap_or_default()
    }

    /// Checks everything that can be checked without the store.
    ///
    /// Item line numbers in errors are 1-based.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.customer_id.is_blank() {
            return Err(ValidationError::CustomerIdRequired);
        }
        if self.items.is_empty() {
            return Err(ValidationError::NoItems);
        }

        let status = self.initial_status();
        if !matches!(status, OrderStatus::Pending | OrderStatus::Created) {
            return Err(ValidationError::InvalidInitialStatus(status));
        }

        for (index, item) in self.items.iter().enumerate() {
            let line = index + 1;
            if item.product_id.is_blank() {
                return Err(ValidationError::ProductIdRequired { line });
            }
            if item.quantity <= 0 {
                return Err(ValidationError::InvalidQuantity {
                    line,
                    quantity: item.quantity,
                });
            }
            if let Some(price) = item.unit_price
                && price.is_negative()
            {
                return Err(ValidationError::InvalidPrice {
                    line,
                    cents: price.cents(),
                });
            }
        }

        for payment in &self.payments {
            let sequential = payment.payment_sequential;
            if payment.payment_type.trim().is_empty() {
                return Err(ValidationError::PaymentTypeRequired { sequential });
            }
            if payment.payment_installments < 1 {
                return Err(ValidationError::InvalidInstallments {
                    sequential,
                    installments: payment.payment_installments,
                });
            }
            if payment.payment_value.is_negative() {
                return Err(ValidationError::NegativePaymentValue { sequential });
            }
        }

        for review in &self.reviews {
            if !(1..=5).contains(&review.review_score) {
                return Err(ValidationError::InvalidReviewScore {
                    score: review.review_score,
                });
            }
        }

        Ok(())
    }
}

/// Command to change an order's status without touching its items or stock.
#[derive(Debug, Clone)]
pub struct UpdateStatus {
    pub order_id: OrderId,
    pub status: OrderStatus,
}

impl UpdateStatus {
    /// Creates a new UpdateStatus command.
    pub fn new(order_id: OrderId, status: OrderStatus) -> Self {
        Self { order_id, status }
    }
}

/// Command to edit an order's header fields.
///
/// Fields left as `None` keep their stored value. Status changes go through
/// [`UpdateStatus`] so that transition rules always apply.
#[derive(Debug, Clone, Default)]
pub struct UpdateOrder {
    pub order_id: OrderId,
    pub invoice_no: Option<String>,
    pub estimated_delivery_at: Option<DateTime<Utc>>,
    pub delivered_carrier_at: Option<DateTime<Utc>>,
}

impl UpdateOrder {
    /// Creates an UpdateOrder command that changes nothing yet.
    pub fn new(order_id: OrderId) -> Self {
        Self {
            order_id,
            ..Self::default()
        }
    }

    pub fn with_invoice_no(mut self, invoice_no: impl Into<String>) -> Self {
        self.invoice_no = Some(invoice_no.into());
        self
    }

    pub fn with_estimated_delivery_at(mut self, at: DateTime<Utc>) -> Self {
        self.estimated_delivery_at = Some(at);
        self
    }

    pub fn with_delivered_carrier_at(mut self, at: DateTime<Utc>) -> Self {
        self.delivered_carrier_at = Some(at);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(invoice_no) = &self.invoice_no
            && invoice_no.trim().is_empty()
        {
            return Err(ValidationError::InvoiceNoBlank);
        }
        Ok(())
    }
}

/// Command to cancel an order: restore its stock, then delete it with all dependents.
#[derive(Debug, Clone)]
pub struct CancelOrder {
    pub order_id: OrderId,
}

impl CancelOrder {
    /// Creates a new CancelOrder command.
    pub fn new(order_id: OrderId) -> Self {
        Self { order_id }
    }
}

/// Command to delete an order and its dependents without restoring stock.
#[derive(Debug, Clone)]
pub struct DeleteOrder {
    pub order_id: OrderId,
}

impl DeleteOrder {
    /// Creates a new DeleteOrder command.
    pub fn new(order_id: OrderId) -> Self {
        Self { order_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_order() -> CreateOrder {
        CreateOrder::new("C-1", vec![OrderLine::new("P-1", 2)])
    }

    #[test]
    fn valid_order_passes() {
        let cmd = valid_order()
            .with_payment(PaymentLine::new(1, "credit_card", 3, Money::from_cents(2000)))
            .with_review(ReviewLine::new(5).with_comment("Great", "Arrived early"));
        assert_eq!(cmd.validate(), Ok(()));
        assert_eq!(cmd.initial_status(), OrderStatus::Pending);
    }

    #[test]
    fn update_order_rejects_blank_invoice() {
        let cmd = UpdateOrder::new(OrderId::new()).with_invoice_no(" ");
        assert_eq!(cmd.validate(), Err(ValidationError::InvoiceNoBlank));

        let cmd = UpdateOrder::new(OrderId::new()).with_estimated_delivery_at(Utc::now());
        assert_eq!(cmd.validate(), Ok(()));
    }

    #[test]
    fn blank_customer_is_rejected() {
        let cmd = CreateOrder::new("  ", vec![OrderLine::new("P-1", 1)]);
        assert_eq!(cmd.validate(), Err(ValidationError::CustomerIdRequired));
    }

    #[test]
    fn empty_items_are_rejected() {
        let cmd = CreateOrder::new("C-1", vec![]);
        assert_eq!(cmd.validate(), Err(ValidationError::NoItems));
    }

    #[test]
    fn non_positive_quantity_reports_line_number() {
        let cmd = CreateOrder::new(
            "C-1",
            vec![OrderLine::new("P-1", 1), OrderLine::new("P-2", 0)],
        );
        assert_eq!(
            cmd.validate(),
            Err(ValidationError::InvalidQuantity {
                line: 2,
                quantity: 0
            })
        );
    }

    #[test]
    fn negative_price_override_is_rejected() {
        let cmd = CreateOrder::new(
            "C-1",
            vec![OrderLine::with_price("P-1", 1, Money::from_cents(-1))],
        );
        assert_eq!(
            cmd.validate(),
            Err(ValidationError::InvalidPrice { line: 1, cents: -1 })
        );
    }

    #[test]
    fn zero_price_override_is_allowed() {
        let cmd = CreateOrder::new(
            "C-1",
            vec![OrderLine::with_price("P-1", 1, Money::zero())],
        );
        assert_eq!(cmd.validate(), Ok(()));
    }

    #[test]
    fn payment_checks() {
        let cmd = valid_order().with_payment(PaymentLine::new(1, "voucher", 0, Money::zero()));
        assert_eq!(
            cmd.validate(),
            Err(ValidationError::InvalidInstallments {
                sequential: 1,
                installments: 0
            })
        );

        let cmd = valid_order().with_payment(PaymentLine::new(2, "", 1, Money::zero()));
        assert_eq!(
            cmd.validate(),
            Err(ValidationError::PaymentTypeRequired { sequential: 2 })
        );

        let cmd =
            valid_order().with_payment(PaymentLine::new(3, "boleto", 1, Money::from_cents(-5)));
        assert_eq!(
            cmd.validate(),
            Err(ValidationError::NegativePaymentValue { sequential: 3 })
        );
    }

    #[test]
    fn review_score_must_be_in_range() {
        let cmd = valid_order().with_review(ReviewLine::new(6));
        assert_eq!(
            cmd.validate(),
            Err(ValidationError::InvalidReviewScore { score: 6 })
        );
    }

    #[test]
    fn initial_status_must_be_pending_or_created() {
        assert_eq!(
            valid_order().with_status(OrderStatus::Created).validate(),
            Ok(())
        );
        assert_eq!(
            valid_order().with_status(OrderStatus::Delivered).validate(),
            Err(ValidationError::InvalidInitialStatus(OrderStatus::Delivered))
        );
    }
}
