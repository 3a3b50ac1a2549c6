use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    CustomerId, NewReview, OrderId, OrderItemRecord, OrderRecord, PaymentRecord, ProductId,
    ProductRecord, RemovedDependents, Result, ReviewRecord, StoreError,
    store::{OrderStore, StoreTransaction},
};

#[derive(Debug, Clone, Default)]
struct Tables {
    customers: HashSet<CustomerId>,
    products: HashMap<ProductId, ProductRecord>,
    orders: HashMap<OrderId, OrderRecord>,
    items: BTreeMap<(OrderId, i32), OrderItemRecord>,
    payments: BTreeMap<(OrderId, i32), PaymentRecord>,
    reviews: Vec<ReviewRecord>,
}

impl Tables {
    fn has_dependents(&self, order_id: OrderId) -> bool {
        self.items.keys().any(|(id, _)| *id == order_id)
            || self.payments.keys().any(|(id, _)| *id == order_id)
            || self.reviews.iter().any(|r| r.order_id == order_id)
    }

    fn require_order(&self, order_id: OrderId, constraint: &str) -> Result<()> {
        if self.orders.contains_key(&order_id) {
            Ok(())
        } else {
            Err(StoreError::ForeignKeyViolation {
                constraint: constraint.to_string(),
            })
        }
    }
}

/// In-memory order store implementation for testing.
///
/// Enforces the same keys and constraints as the PostgreSQL schema. A transaction
/// holds an exclusive lock on all tables until it is committed or dropped, so
/// concurrent transactions run one after another.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a customer that orders may reference.
    pub async fn insert_customer(&self, customer_id: impl Into<CustomerId>) {
        self.tables.lock().await.customers.insert(customer_id.into());
    }

    /// Inserts or replaces a product row.
    pub async fn insert_product(&self, product: ProductRecord) {
        self.tables
            .lock()
            .await
            .products
            .insert(product.product_id.clone(), product);
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.tables.lock().await.orders.len()
    }

    /// Returns the number of stored item, payment and review rows for an order.
    pub async fn dependent_count(&self, order_id: OrderId) -> RemovedDependents {
        let tables = self.tables.lock().await;
        RemovedDependents {
            items: tables.items.keys().filter(|(id, _)| *id == order_id).count() as u64,
            payments: tables
                .payments
                .keys()
                .filter(|(id, _)| *id == order_id)
                .count() as u64,
            reviews: tables.reviews.iter().filter(|r| r.order_id == order_id).count() as u64,
        }
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    type Tx = InMemoryTransaction;

    async fn begin(&self) -> Result<InMemoryTransaction> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(InMemoryTransaction { guard, working })
    }

    async fn begin_snapshot(&self) -> Result<InMemoryTransaction> {
        self.begin().await
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn find_product(&self, product_id: &ProductId) -> Result<Option<ProductRecord>> {
        Ok(self.tables.lock().await.products.get(product_id).cloned())
    }
}

/// An open in-memory transaction.
///
/// Statements apply to a private copy of the tables; `commit` publishes the copy.
/// Dropping the handle discards it.
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn lock_product(&mut self, product_id: &ProductId) -> Result<Option<ProductRecord>> {
        Ok(self.working.products.get(product_id).cloned())
    }

    async fn adjust_stock(&mut self, product_id: &ProductId, delta: i32) -> Result<bool> {
        let Some(product) = self.working.products.get_mut(product_id) else {
            return Ok(false);
        };

        let updated = product
            .stock_quantity
            .checked_add(delta)
            .filter(|stock| *stock >= 0)
            .ok_or_else(|| StoreError::CheckViolation {
                constraint: "products_stock_non_negative".to_string(),
            })?;
        product.stock_quantity = updated;
        Ok(true)
    }

    async fn insert_order(&mut self, order: &OrderRecord) -> Result<()> {
        if !self.working.customers.contains(&order.customer_id) {
            return Err(StoreError::ForeignKeyViolation {
                constraint: "orders_customer_id_fkey".to_string(),
            });
        }
        if self.working.orders.contains_key(&order.order_id) {
            return Err(StoreError::UniqueViolation {
                constraint: "orders_pkey".to_string(),
            });
        }

        self.working.orders.insert(order.order_id, order.clone());
        Ok(())
    }

    async fn insert_order_item(&mut self, item: &OrderItemRecord) -> Result<()> {
        self.working
            .require_order(item.order_id, "order_items_order_id_fkey")?;
        if !self.working.products.contains_key(&item.product_id) {
            return Err(StoreError::ForeignKeyViolation {
                constraint: "order_items_product_id_fkey".to_string(),
            });
        }
        if item.quantity <= 0 {
            return Err(StoreError::CheckViolation {
                constraint: "order_items_quantity_positive".to_string(),
            });
        }

        let key = (item.order_id, item.order_item_id);
        if self.working.items.contains_key(&key) {
            return Err(StoreError::UniqueViolation {
                constraint: "order_items_pkey".to_string(),
            });
        }
        self.working.items.insert(key, item.clone());
        Ok(())
    }

    async fn insert_payment(&mut self, payment: &PaymentRecord) -> Result<()> {
        self.working
            .require_order(payment.order_id, "order_payments_order_id_fkey")?;

        let key = (payment.order_id, payment.payment_sequential);
        if self.working.payments.contains_key(&key) {
            return Err(StoreError::UniqueViolation {
                constraint: "order_payments_pkey".to_string(),
            });
        }
        self.working.payments.insert(key, payment.clone());
        Ok(())
    }

    async fn insert_review(&mut self, review: &NewReview) -> Result<ReviewRecord> {
        self.working
            .require_order(review.order_id, "order_reviews_order_id_fkey")?;
        if !(1..=5).contains(&review.review_score) {
            return Err(StoreError::CheckViolation {
                constraint: "order_reviews_score_range".to_string(),
            });
        }
        if self
            .working
            .reviews
            .iter()
            .any(|r| r.review_id == review.review_id)
        {
            return Err(StoreError::UniqueViolation {
                constraint: "order_reviews_pkey".to_string(),
            });
        }

        let record = ReviewRecord {
            review_id: review.review_id,
            order_id: review.order_id,
            review_score: review.review_score,
            review_comment_title: review.review_comment_title.clone(),
            review_comment_message: review.review_comment_message.clone(),
            review_creation_date: Utc::now(),
            review_answer_timestamp: None,
        };
        self.working.reviews.push(record.clone());
        Ok(record)
    }

    async fn lock_order(&mut self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self.working.orders.get(&order_id).cloned())
    }

    async fn update_order(&mut self, order: &OrderRecord) -> Result<()> {
        if let Some(stored) = self.working.orders.get_mut(&order.order_id) {
            stored.invoice_no = order.invoice_no.clone();
            stored.status = order.status;
            stored.approved_at = order.approved_at;
            stored.delivered_carrier_at = order.delivered_carrier_at;
            stored.delivered_at = order.delivered_at;
            stored.estimated_delivery_at = order.estimated_delivery_at;
        }
        Ok(())
    }

    async fn find_order(&mut self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self.working.orders.get(&order_id).cloned())
    }

    async fn order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItemRecord>> {
        Ok(self
            .working
            .items
            .range((order_id, i32::MIN)..=(order_id, i32::MAX))
            .map(|(_, item)| item.clone())
            .collect())
    }

    async fn order_payments(&mut self, order_id: OrderId) -> Result<Vec<PaymentRecord>> {
        Ok(self
            .working
            .payments
            .range((order_id, i32::MIN)..=(order_id, i32::MAX))
            .map(|(_, payment)| payment.clone())
            .collect())
    }

    async fn order_reviews(&mut self, order_id: OrderId) -> Result<Vec<ReviewRecord>> {
        Ok(self
            .working
            .reviews
            .iter()
            .filter(|r| r.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn delete_dependents(&mut self, order_id: OrderId) -> Result<RemovedDependents> {
        let tables = &mut self.working;

        let items_before = tables.items.len();
        tables.items.retain(|(id, _), _| *id != order_id);
        let payments_before = tables.payments.len();
        tables.payments.retain(|(id, _), _| *id != order_id);
        let reviews_before = tables.reviews.len();
        tables.reviews.retain(|r| r.order_id != order_id);

        Ok(RemovedDependents {
            items: (items_before - tables.items.len()) as u64,
            payments: (payments_before - tables.payments.len()) as u64,
            reviews: (reviews_before - tables.reviews.len()) as u64,
        })
    }

    async fn delete_order(&mut self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        if self.working.has_dependents(order_id) {
            return Err(StoreError::ForeignKeyViolation {
                constraint: "order_items_order_id_fkey".to_string(),
            });
        }
        Ok(self.working.orders.remove(&order_id))
    }

    async fn commit(mut self) -> Result<()> {
        *self.guard = std::mem::take(&mut self.working);
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}
