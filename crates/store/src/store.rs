use async_trait::async_trait;

use crate::{
    NewReview, OrderId, OrderItemRecord, OrderRecord, PaymentRecord, ProductId, ProductRecord,
    RemovedDependents, Result, ReviewRecord,
};

/// Core trait for order store implementations.
///
/// Order rows are read and written only inside a [`StoreTransaction`].
/// Product lookups for stock inspection run outside any transaction.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// The transaction handle type.
    type Tx: StoreTransaction;

    /// Opens a new transaction.
    ///
    /// Dropping the returned handle without calling `commit` rolls it back.
    async fn begin(&self) -> Result<Self::Tx>;

    /// Opens a read-only transaction in which every read sees the same snapshot.
    async fn begin_snapshot(&self) -> Result<Self::Tx>;

    /// Checks that the store is reachable.
    async fn ping(&self) -> Result<()>;

    /// Loads a product row.
    async fn find_product(&self, product_id: &ProductId) -> Result<Option<ProductRecord>>;
}

/// A single open transaction against the order store.
///
/// All statements issued through one handle commit or roll back together.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Reads a product row and locks it for the rest of the transaction.
    ///
    /// Returns None if the product doesn't exist.
    async fn lock_product(&mut self, product_id: &ProductId) -> Result<Option<ProductRecord>>;

    /// Adds `delta` (possibly negative) to a product's stock.
    ///
    /// Returns false if the product doesn't exist.
    async fn adjust_stock(&mut self, product_id: &ProductId, delta: i32) -> Result<bool>;

    /// Inserts an order header.
    async fn insert_order(&mut self, order: &OrderRecord) -> Result<()>;

    /// Inserts an order line.
    async fn insert_order_item(&mut self, item: &OrderItemRecord) -> Result<()>;

    /// Inserts a payment.
    async fn insert_payment(&mut self, payment: &PaymentRecord) -> Result<()>;

    /// Inserts a review, stamping its creation date.
    async fn insert_review(&mut self, review: &NewReview) -> Result<ReviewRecord>;

    /// Reads an order header and locks it for the rest of the transaction.
    async fn lock_order(&mut self, order_id: OrderId) -> Result<Option<OrderRecord>>;

    /// Writes the mutable header fields of an order: invoice number, status
    /// and the approval, carrier, delivery and estimated delivery dates.
    async fn update_order(&mut self, order: &OrderRecord) -> Result<()>;

    /// Reads an order header without locking it.
    async fn find_order(&mut self, order_id: OrderId) -> Result<Option<OrderRecord>>;

    /// Reads the items of an order, ordered by `order_item_id`.
    async fn order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItemRecord>>;

    /// Reads the payments of an order, ordered by `payment_sequential`.
    async fn order_payments(&mut self, order_id: OrderId) -> Result<Vec<PaymentRecord>>;

    /// Reads the reviews of an order, oldest first.
    async fn order_reviews(&mut self, order_id: OrderId) -> Result<Vec<ReviewRecord>>;

    /// Deletes the items, payments and reviews of an order.
    async fn delete_dependents(&mut self, order_id: OrderId) -> Result<RemovedDependents>;

    /// Deletes an order header, returning the deleted row.
    ///
    /// Returns None if no row was deleted.
    async fn delete_order(&mut self, order_id: OrderId) -> Result<Option<OrderRecord>>;

    /// Commits the transaction.
    async fn commit(self) -> Result<()>;

    /// Rolls the transaction back explicitly.
    async fn rollback(self) -> Result<()>;
}
