//! Order lifecycle manager: one store transaction per operation.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use chrono::Utc;
use common::{OrderId, OrderStatus, ProductId, ReviewId};
use store::{
    NewReview, OrderItemRecord, OrderRecord, OrderStore, PaymentRecord, ProductRecord,
    ReviewRecord, StoreTransaction,
};

use super::pricing::{self, PricedOrder};
use super::{
    CancelOrder, CancelledOrder, CreateOrder, DeleteOrder, DeletedOrder, OrderDetails, OrderLine,
    RestoredStock, UpdateOrder, UpdateStatus,
};
use crate::error::OrderError;

/// Creates, updates, cancels and deletes orders against an [`OrderStore`].
///
/// Every operation runs in a single store transaction. A transaction handle is
/// rolled back when dropped, so an early return through `?` never leaves partial
/// writes behind. The manager never retries.
pub struct OrderLifecycleManager<S: OrderStore> {
    store: S,
}

impl<S: OrderStore> OrderLifecycleManager<S> {
    /// Creates a new manager over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates an order with its items, payments and reviews, and takes the
    /// ordered quantities out of stock.
    ///
    /// Validation runs before any transaction is opened. Product rows are locked
    /// before their stock is read, so concurrent orders cannot both pass the
    /// stock check against the same quantity.
    #[tracing::instrument(
        skip(self, cmd),
        fields(customer_id = %cmd.customer_id, lines = cmd.items.len())
    )]
    pub async fn create_order(&self, cmd: CreateOrder) -> Result<OrderDetails, OrderError> {
        let started = Instant::now();

        let result = match cmd.validate() {
            Ok(()) => self.create_order_in_tx(&cmd).await,
            Err(e) => Err(e.into()),
        };

        match &result {
            Ok(details) => {
                metrics::counter!("orders_created_total").increment(1);
                metrics::histogram!("order_create_duration_seconds")
                    .record(started.elapsed().as_secs_f64());
                tracing::info!(
                    order_id = %details.order.order_id,
                    total_amount = %details.order.total_amount,
                    total_items = details.order.total_items,
                    "order created"
                );
            }
            Err(e) => {
                metrics::counter!("orders_create_failed_total", "reason" => e.kind())
                    .increment(1);
                match e {
                    OrderError::Storage(_) => tracing::error!(error = %e, "order creation failed"),
                    _ => tracing::warn!(error = %e, "order rejected"),
                }
            }
        }

        result
    }

    async fn create_order_in_tx(&self, cmd: &CreateOrder) -> Result<OrderDetails, OrderError> {
        let mut tx = self.store.begin().await?;

        let products = lock_products(&mut tx, &cmd.items).await?;
        let priced = pricing::price_order(&cmd.items, &products)?;

        let order = OrderRecord {
            order_id: OrderId::new(),
            customer_id: cmd.customer_id.clone(),
            invoice_no: cmd.invoice_no.clone(),
            status: cmd.initial_status(),
            total_amount: priced.total_amount,
            total_items: priced.total_items,
            created_at: Utc::now(),
            approved_at: None,
            delivered_carrier_at: None,
            delivered_at: None,
            estimated_delivery_at: cmd.estimated_delivery_at,
        };
        tx.insert_order(&order).await?;

        let items = insert_items(&mut tx, order.order_id, &priced).await?;

        let mut payments = Vec::with_capacity(cmd.payments.len());
        for line in &cmd.payments {
            let payment = PaymentRecord {
                order_id: order.order_id,
                payment_sequential: line.payment_sequential,
                payment_type: line.payment_type.clone(),
                payment_installments: line.payment_installments,
                payment_value: line.payment_value,
            };
            tx.insert_payment(&payment).await?;
            payments.push(payment);
        }

        let mut reviews: Vec<ReviewRecord> = Vec::with_capacity(cmd.reviews.len());
        for line in &cmd.reviews {
            let review = NewReview {
                review_id: ReviewId::new(),
                order_id: order.order_id,
                review_score: line.review_score,
                review_comment_title: line.review_comment_title.clone(),
                review_comment_message: line.review_comment_message.clone(),
            };
            reviews.push(tx.insert_review(&review).await?);
        }

        for (product_id, quantity) in &priced.reserved {
            tx.adjust_stock(product_id, -quantity).await?;
        }

        tx.commit().await?;

        Ok(OrderDetails {
            order,
            items,
            payments,
            reviews,
        })
    }

    /// Changes an order's status.
    ///
    /// Items, payments and stock are left untouched, including when the new
    /// status is `cancelled`. Stamps `approved_at`, `delivered_carrier_at` and
    /// `delivered_at` when the order reaches approved, shipped and delivered.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id, status = %cmd.status))]
    pub async fn update_status(&self, cmd: UpdateStatus) -> Result<OrderRecord, OrderError> {
        let mut tx = self.store.begin().await?;

        let Some(mut order) = tx.lock_order(cmd.order_id).await? else {
            tx.rollback().await?;
            return Err(OrderError::OrderNotFound(cmd.order_id));
        };

        let from = order.status;
        if !from.can_transition_to(cmd.status) {
            tx.rollback().await?;
            tracing::warn!(%from, to = %cmd.status, "status transition rejected");
            return Err(OrderError::InvalidStatusTransition {
                from,
                to: cmd.status,
            });
        }

        let now = Utc::now();
        match cmd.status {
            OrderStatus::Approved if order.approved_at.is_none() => order.approved_at = Some(now),
            OrderStatus::Shipped if order.delivered_carrier_at.is_none() => {
                order.delivered_carrier_at = Some(now)
            }
            OrderStatus::Delivered => order.delivered_at = Some(now),
            _ => {}
        }
        order.status = cmd.status;

        tx.update_order(&order).await?;
        tx.commit().await?;

        metrics::counter!("order_status_updates_total", "status" => cmd.status.as_str())
            .increment(1);
        tracing::info!(%from, to = %order.status, "order status updated");
        Ok(order)
    }

    /// Edits an order's invoice number and delivery dates.
    ///
    /// Only the fields set on the command change. Status, items and stock are
    /// left untouched.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id))]
    pub async fn update_order(&self, cmd: UpdateOrder) -> Result<OrderRecord, OrderError> {
        cmd.validate()?;

        let mut tx = self.store.begin().await?;

        let Some(mut order) = tx.lock_order(cmd.order_id).await? else {
            tx.rollback().await?;
            return Err(OrderError::OrderNotFound(cmd.order_id));
        };

        if let Some(invoice_no) = cmd.invoice_no {
            order.invoice_no = Some(invoice_no);
        }
        if let Some(at) = cmd.estimated_delivery_at {
            order.estimated_delivery_at = Some(at);
        }
        if let Some(at) = cmd.delivered_carrier_at {
            order.delivered_carrier_at = Some(at);
        }

        tx.update_order(&order).await?;
        tx.commit().await?;

        metrics::counter!("order_updates_total").increment(1);
        tracing::info!("order updated");
        Ok(order)
    }

    /// Cancels an order: gives its item quantities back to stock and deletes the
    /// order with its items, payments and reviews.
    ///
    /// Existence is decided by the header delete, not a pre-read.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id))]
    pub async fn cancel_order(&self, cmd: CancelOrder) -> Result<CancelledOrder, OrderError> {
        let mut tx = self.store.begin().await?;

        let items = tx.order_items(cmd.order_id).await?;
        let restored_stock = restore_stock(&mut tx, &items).await?;
        let removed = tx.delete_dependents(cmd.order_id).await?;

        let Some(order) = tx.delete_order(cmd.order_id).await? else {
            tx.rollback().await?;
            tracing::warn!("cancel requested for unknown order");
            return Err(OrderError::OrderNotFound(cmd.order_id));
        };

        tx.commit().await?;

        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(
            products_restored = restored_stock.len(),
            items = removed.items,
            payments = removed.payments,
            reviews = removed.reviews,
            "order cancelled"
        );

        Ok(CancelledOrder {
            order,
            restored_stock,
            removed,
        })
    }

    /// Deletes an order with its items, payments and reviews. Stock is not restored.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id))]
    pub async fn delete_order(&self, cmd: DeleteOrder) -> Result<DeletedOrder, OrderError> {
        let mut tx = self.store.begin().await?;

        let removed = tx.delete_dependents(cmd.order_id).await?;

        let Some(order) = tx.delete_order(cmd.order_id).await? else {
            tx.rollback().await?;
            tracing::warn!("delete requested for unknown order");
            return Err(OrderError::OrderNotFound(cmd.order_id));
        };

        tx.commit().await?;

        metrics::counter!("orders_deleted_total").increment(1);
        tracing::info!(
            items = removed.items,
            payments = removed.payments,
            reviews = removed.reviews,
            "order deleted"
        );

        Ok(DeletedOrder { order, removed })
    }

    /// Loads an order with all of its dependents.
    ///
    /// All four reads come from one snapshot. Returns None if the order
    /// doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Option<OrderDetails>, OrderError> {
        let mut tx = self.store.begin_snapshot().await?;

        let Some(order) = tx.find_order(order_id).await? else {
            tx.rollback().await?;
            return Ok(None);
        };

        let details = OrderDetails {
            order,
            items: tx.order_items(order_id).await?,
            payments: tx.order_payments(order_id).await?,
            reviews: tx.order_reviews(order_id).await?,
        };
        tx.commit().await?;

        Ok(Some(details))
    }

    /// Loads the items of an existing order.
    pub async fn order_items(&self, order_id: OrderId) -> Result<Vec<OrderItemRecord>, OrderError> {
        let mut tx = self.existing_order_snapshot(order_id).await?;
        let items = tx.order_items(order_id).await?;
        tx.commit().await?;
        Ok(items)
    }

    /// Loads the payments of an existing order.
    pub async fn order_payments(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<PaymentRecord>, OrderError> {
        let mut tx = self.existing_order_snapshot(order_id).await?;
        let payments = tx.order_payments(order_id).await?;
        tx.commit().await?;
        Ok(payments)
    }

    /// Loads the reviews of an existing order.
    pub async fn order_reviews(&self, order_id: OrderId) -> Result<Vec<ReviewRecord>, OrderError> {
        let mut tx = self.existing_order_snapshot(order_id).await?;
        let reviews = tx.order_reviews(order_id).await?;
        tx.commit().await?;
        Ok(reviews)
    }

    /// Loads a product with its current stock.
    pub async fn product(&self, product_id: &ProductId) -> Result<ProductRecord, OrderError> {
        self.store
            .find_product(product_id)
            .await?
            .ok_or_else(|| OrderError::ProductNotFound(product_id.clone()))
    }

    /// Opens a snapshot in which the order is known to exist.
    async fn existing_order_snapshot(&self, order_id: OrderId) -> Result<S::Tx, OrderError> {
        let mut tx = self.store.begin_snapshot().await?;
        if tx.find_order(order_id).await?.is_none() {
            tx.rollback().await?;
            return Err(OrderError::OrderNotFound(order_id));
        }
        Ok(tx)
    }
}

/// Locks every distinct product referenced by `lines`.
///
/// Rows are locked in ascending product id order so that two orders touching
/// the same products always acquire the locks in the same sequence.
async fn lock_products<T: StoreTransaction>(
    tx: &mut T,
    lines: &[OrderLine],
) -> Result<BTreeMap<ProductId, ProductRecord>, OrderError> {
    let ids: BTreeSet<&ProductId> = lines.iter().map(|line| &line.product_id).collect();

    let mut locked = BTreeMap::new();
    for product_id in ids {
        let product = tx
            .lock_product(product_id)
            .await?
            .ok_or_else(|| OrderError::ProductNotFound(product_id.clone()))?;
        locked.insert(product_id.clone(), product);
    }

    Ok(locked)
}

async fn insert_items<T: StoreTransaction>(
    tx: &mut T,
    order_id: OrderId,
    priced: &PricedOrder,
) -> Result<Vec<OrderItemRecord>, OrderError> {
    let mut items = Vec::with_capacity(priced.lines.len());

    for (sequence, line) in (1..).zip(&priced.lines) {
        let item = OrderItemRecord {
            order_id,
            order_item_id: sequence,
            product_id: line.product_id.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            line_total: line.line_total,
        };
        tx.insert_order_item(&item).await?;
        items.push(item);
    }

    Ok(items)
}

/// Adds each item's quantity back to its product, one update per product in
/// ascending id order.
async fn restore_stock<T: StoreTransaction>(
    tx: &mut T,
    items: &[OrderItemRecord],
) -> Result<Vec<RestoredStock>, OrderError> {
    let mut per_product: BTreeMap<&ProductId, i32> = BTreeMap::new();
    for item in items {
        *per_product.entry(&item.product_id).or_insert(0) += item.quantity;
    }

    let mut restored = Vec::with_capacity(per_product.len());
    for (product_id, quantity) in per_product {
        if tx.adjust_stock(product_id, quantity).await? {
            restored.push(RestoredStock {
                product_id: product_id.clone(),
                quantity,
            });
        } else {
            tracing::warn!(%product_id, quantity, "product missing, stock not restored");
        }
    }

    Ok(restored)
}
