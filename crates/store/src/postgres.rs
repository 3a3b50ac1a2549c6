use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    CustomerId, Money, NewReview, OrderId, OrderItemRecord, OrderRecord, OrderStatus,
    PaymentRecord, ProductId, ProductRecord, RemovedDependents, Result, ReviewId, ReviewRecord,
    StoreError,
    store::{OrderStore, StoreTransaction},
};

macro_rules! order_columns {
    () => {
        "order_id, customer_id, invoice_no, status, total_amount_cents, total_items, \
         created_at, approved_at, delivered_carrier_at, delivered_at, estimated_delivery_at"
    };
}

macro_rules! item_columns {
    () => {
        "order_id, order_item_id, product_id, quantity, unit_price_cents, line_total_cents"
    };
}

macro_rules! review_columns {
    () => {
        "review_id, order_id, review_score, review_comment_title, review_comment_message, \
         review_creation_date, review_answer_timestamp"
    };
}

/// PostgreSQL-backed order store implementation.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn row_to_order(row: &PgRow) -> Result<OrderRecord> {
    let status: String = row.try_get("status")?;
    let status = status
        .parse::<OrderStatus>()
        .map_err(|e| StoreError::CorruptRow(e.to_string()))?;

    Ok(OrderRecord {
        order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        customer_id: CustomerId::new(row.try_get::<String, _>("customer_id")?),
        invoice_no: row.try_get("invoice_no")?,
        status,
        total_amount: Money::from_cents(row.try_get("total_amount_cents")?),
        total_items: row.try_get("total_items")?,
        created_at: row.try_get("created_at")?,
        approved_at: row.try_get("approved_at")?,
        delivered_carrier_at: row.try_get("delivered_carrier_at")?,
        delivered_at: row.try_get("delivered_at")?,
        estimated_delivery_at: row.try_get("estimated_delivery_at")?,
    })
}

fn row_to_item(row: &PgRow) -> Result<OrderItemRecord> {
    Ok(OrderItemRecord {
        order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        order_item_id: row.try_get("order_item_id")?,
        product_id: ProductId::new(row.try_get::<String, _>("product_id")?),
        quantity: row.try_get("quantity")?,
        unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        line_total: Money::from_cents(row.try_get("line_total_cents")?),
    })
}

fn row_to_payment(row: &PgRow) -> Result<PaymentRecord> {
    Ok(PaymentRecord {
        order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        payment_sequential: row.try_get("payment_sequential")?,
        payment_type: row.try_get("payment_type")?,
        payment_installments: row.try_get("payment_installments")?,
        payment_value: Money::from_cents(row.try_get("payment_value_cents")?),
    })
}

fn row_to_review(row: &PgRow) -> Result<ReviewRecord> {
    Ok(ReviewRecord {
        review_id: ReviewId::from_uuid(row.try_get::<Uuid, _>("review_id")?),
        order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        review_score: row.try_get("review_score")?,
        review_comment_title: row.try_get("review_comment_title")?,
        review_comment_message: row.try_get("review_comment_message")?,
        review_creation_date: row.try_get::<DateTime<Utc>, _>("review_creation_date")?,
        review_answer_timestamp: row.try_get("review_answer_timestamp")?,
    })
}

fn row_to_product(row: &PgRow) -> Result<ProductRecord> {
    Ok(ProductRecord {
        product_id: ProductId::new(row.try_get::<String, _>("product_id")?),
        description: row.try_get("description")?,
        unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        stock_quantity: row.try_get("stock_quantity")?,
    })
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    type Tx = PostgresTransaction;

    async fn begin(&self) -> Result<PostgresTransaction> {
        let tx = self.pool.begin().await?;
        Ok(PostgresTransaction { tx })
    }

    async fn begin_snapshot(&self) -> Result<PostgresTransaction> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;
        Ok(PostgresTransaction { tx })
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_product(&self, product_id: &ProductId) -> Result<Option<ProductRecord>> {
        let row = sqlx::query(
            r#"
            SELECT product_id, description, unit_price_cents, stock_quantity
            FROM products
            WHERE product_id = $1
            "#,
        )
        .bind(product_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_product).transpose()
    }
}

/// An open PostgreSQL transaction. Rolled back by sqlx when dropped uncommitted.
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn lock_product(&mut self, product_id: &ProductId) -> Result<Option<ProductRecord>> {
        let row = sqlx::query(
            r#"
            SELECT product_id, description, unit_price_cents, stock_quantity
            FROM products
            WHERE product_id = $1
            FOR UPDATE
            "#,
        )
        .bind(product_id.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn adjust_stock(&mut self, product_id: &ProductId, delta: i32) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE products SET stock_quantity = stock_quantity + $2 WHERE product_id = $1",
        )
        .bind(product_id.as_str())
        .bind(delta)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_order(&mut self, order: &OrderRecord) -> Result<()> {
        sqlx::query(concat!(
            "INSERT INTO orders (",
            order_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        ))
        .bind(order.order_id.as_uuid())
        .bind(order.customer_id.as_str())
        .bind(&order.invoice_no)
        .bind(order.status.as_str())
        .bind(order.total_amount.cents())
        .bind(order.total_items)
        .bind(order.created_at)
        .bind(order.approved_at)
        .bind(order.delivered_carrier_at)
        .bind(order.delivered_at)
        .bind(order.estimated_delivery_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn insert_order_item(&mut self, item: &OrderItemRecord) -> Result<()> {
        sqlx::query(concat!(
            "INSERT INTO order_items (",
            item_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6)"
        ))
        .bind(item.order_id.as_uuid())
        .bind(item.order_item_id)
        .bind(item.product_id.as_str())
        .bind(item.quantity)
        .bind(item.unit_price.cents())
        .bind(item.line_total.cents())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn insert_payment(&mut self, payment: &PaymentRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO order_payments
                (order_id, payment_sequential, payment_type, payment_installments, payment_value_cents)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(payment.order_id.as_uuid())
        .bind(payment.payment_sequential)
        .bind(&payment.payment_type)
        .bind(payment.payment_installments)
        .bind(payment.payment_value.cents())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn insert_review(&mut self, review: &NewReview) -> Result<ReviewRecord> {
        let row = sqlx::query(concat!(
            "INSERT INTO order_reviews ",
            "(review_id, order_id, review_score, review_comment_title, review_comment_message, review_creation_date) ",
            "VALUES ($1, $2, $3, $4, $5, NOW()) RETURNING ",
            review_columns!()
        ))
        .bind(review.review_id.as_uuid())
        .bind(review.order_id.as_uuid())
        .bind(review.review_score)
        .bind(&review.review_comment_title)
        .bind(&review.review_comment_message)
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_review(&row)
    }

    async fn lock_order(&mut self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders WHERE order_id = $1 FOR UPDATE"
        ))
        .bind(order_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_order).transpose()
    }

    async fn update_order(&mut self, order: &OrderRecord) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE orders
            SET invoice_no = $2,
                status = $3,
                approved_at = $4,
                delivered_carrier_at = $5,
                delivered_at = $6,
                estimated_delivery_at = $7
            WHERE order_id = $1
            "#,
        )
        .bind(order.order_id.as_uuid())
        .bind(&order.invoice_no)
        .bind(order.status.as_str())
        .bind(order.approved_at)
        .bind(order.delivered_carrier_at)
        .bind(order.delivered_at)
        .bind(order.estimated_delivery_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItemRecord>> {
        let rows = sqlx::query(concat!(
            "SELECT ",
            item_columns!(),
            " FROM order_items WHERE order_id = $1 ORDER BY order_item_id ASC"
        ))
        .bind(order_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(row_to_item).collect()
    }

    async fn find_order(&mut self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders WHERE order_id = $1"
        ))
        .bind(order_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_order).transpose()
    }

    async fn order_payments(&mut self, order_id: OrderId) -> Result<Vec<PaymentRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, payment_sequential, payment_type, payment_installments, payment_value_cents
            FROM order_payments
            WHERE order_id = $1
            ORDER BY payment_sequential ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(row_to_payment).collect()
    }

    async fn order_reviews(&mut self, order_id: OrderId) -> Result<Vec<ReviewRecord>> {
        let rows = sqlx::query(concat!(
            "SELECT ",
            review_columns!(),
            " FROM order_reviews WHERE order_id = $1 ORDER BY review_creation_date ASC, review_id ASC"
        ))
        .bind(order_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(row_to_review).collect()
    }

    async fn delete_dependents(&mut self, order_id: OrderId) -> Result<RemovedDependents> {
        // Children first, the orders foreign keys don't cascade
        let items = sqlx::query("DELETE FROM order_items WHERE order_id = $1")
            .bind(order_id.as_uuid())
            .execute(&mut *self.tx)
            .await?
            .rows_affected();
        let payments = sqlx::query("DELETE FROM order_payments WHERE order_id = $1")
            .bind(order_id.as_uuid())
            .execute(&mut *self.tx)
            .await?
            .rows_affected();
        let reviews = sqlx::query("DELETE FROM order_reviews WHERE order_id = $1")
            .bind(order_id.as_uuid())
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(RemovedDependents {
            items,
            payments,
            reviews,
        })
    }

    async fn delete_order(&mut self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(concat!(
            "DELETE FROM orders WHERE order_id = $1 RETURNING ",
            order_columns!()
        ))
        .bind(order_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_order).transpose()
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
