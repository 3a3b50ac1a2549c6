//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use store::{
    CustomerId, Money, NewReview, OrderId, OrderItemRecord, OrderRecord, OrderStatus, OrderStore,
    PaymentRecord, PostgresOrderStore, ProductId, ReviewId, StoreError, StoreTransaction,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_order_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool, cleared tables and one customer `C-1`
async fn get_test_store() -> PostgresOrderStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query(
        "TRUNCATE TABLE order_reviews, order_payments, order_items, orders, products, customers",
    )
    .execute(&pool)
    .await
    .unwrap();

    sqlx::query("INSERT INTO customers (customer_id, customer_name) VALUES ('C-1', 'Ana')")
        .execute(&pool)
        .await
        .unwrap();

    PostgresOrderStore::new(pool)
}

async fn insert_product(store: &PostgresOrderStore, id: &str, price_cents: i64, stock: i32) {
    sqlx::query(
        "INSERT INTO products (product_id, unit_price_cents, stock_quantity) VALUES ($1, $2, $3)",
    )
    .bind(id)
    .bind(price_cents)
    .bind(stock)
    .execute(store.pool())
    .await
    .unwrap();
}

fn test_order(customer: &str) -> OrderRecord {
    OrderRecord {
        order_id: OrderId::new(),
        customer_id: CustomerId::new(customer),
        invoice_no: Some("INV-1".to_string()),
        status: OrderStatus::Pending,
        total_amount: Money::from_cents(2000),
        total_items: 2,
        created_at: Utc::now(),
        approved_at: None,
        delivered_carrier_at: None,
        delivered_at: None,
        estimated_delivery_at: None,
    }
}

async fn read_order(store: &PostgresOrderStore, order_id: OrderId) -> Option<OrderRecord> {
    let mut tx = store.begin_snapshot().await.unwrap();
    let order = tx.find_order(order_id).await.unwrap();
    tx.commit().await.unwrap();
    order
}

fn test_item(order_id: OrderId, seq: i32, product: &str, quantity: i32) -> OrderItemRecord {
    OrderItemRecord {
        order_id,
        order_item_id: seq,
        product_id: ProductId::new(product),
        quantity,
        unit_price: Money::from_cents(1000),
        line_total: Money::from_cents(1000 * i64::from(quantity)),
    }
}

#[tokio::test]
async fn insert_and_read_back_full_order() {
    let store = get_test_store().await;
    insert_product(&store, "P-1", 1000, 10).await;
    let order = test_order("C-1");

    let mut tx = store.begin().await.unwrap();
    tx.insert_order(&order).await.unwrap();
    tx.insert_order_item(&test_item(order.order_id, 1, "P-1", 2))
        .await
        .unwrap();
    tx.insert_payment(&PaymentRecord {
        order_id: order.order_id,
        payment_sequential: 1,
        payment_type: "boleto".to_string(),
        payment_installments: 1,
        payment_value: Money::from_cents(2000),
    })
    .await
    .unwrap();
    let review = tx
        .insert_review(&NewReview {
            review_id: ReviewId::new(),
            order_id: order.order_id,
            review_score: 5,
            review_comment_title: Some("great".to_string()),
            review_comment_message: None,
        })
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin_snapshot().await.unwrap();
    let stored = tx.find_order(order.order_id).await.unwrap().unwrap();
    assert_eq!(stored.customer_id, order.customer_id);
    assert_eq!(stored.status, OrderStatus::Pending);
    assert_eq!(stored.total_amount, Money::from_cents(2000));

    let items = tx.order_items(order.order_id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].line_total, Money::from_cents(2000));

    let payments = tx.order_payments(order.order_id).await.unwrap();
    assert_eq!(payments.len(), 1);

    let reviews = tx.order_reviews(order.order_id).await.unwrap();
    tx.commit().await.unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].review_id, review.review_id);
    assert!(reviews[0].review_creation_date <= Utc::now());
}

#[tokio::test]
async fn dropped_transaction_rolls_back() {
    let store = get_test_store().await;
    insert_product(&store, "P-1", 1000, 10).await;
    let order = test_order("C-1");

    {
        let mut tx = store.begin().await.unwrap();
        tx.insert_order(&order).await.unwrap();
        tx.adjust_stock(&ProductId::new("P-1"), -3).await.unwrap();
    }

    assert!(read_order(&store, order.order_id).await.is_none());
    let product = store
        .find_product(&ProductId::new("P-1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(product.stock_quantity, 10);
}

#[tokio::test]
async fn unknown_customer_is_a_foreign_key_violation() {
    let store = get_test_store().await;

    let mut tx = store.begin().await.unwrap();
    let err = tx.insert_order(&test_order("C-404")).await.unwrap_err();
    assert!(matches!(err, StoreError::ForeignKeyViolation { .. }));
    assert_eq!(err.constraint(), Some("orders_customer_id_fkey"));
}

#[tokio::test]
async fn duplicate_payment_sequential_is_a_unique_violation() {
    let store = get_test_store().await;
    let order = test_order("C-1");
    let payment = PaymentRecord {
        order_id: order.order_id,
        payment_sequential: 1,
        payment_type: "credit_card".to_string(),
        payment_installments: 3,
        payment_value: Money::from_cents(1000),
    };

    let mut tx = store.begin().await.unwrap();
    tx.insert_order(&order).await.unwrap();
    tx.insert_payment(&payment).await.unwrap();
    let err = tx.insert_payment(&payment).await.unwrap_err();
    assert!(matches!(err, StoreError::UniqueViolation { .. }));
    assert_eq!(err.constraint(), Some("order_payments_pkey"));
}

#[tokio::test]
async fn negative_stock_is_a_check_violation() {
    let store = get_test_store().await;
    insert_product(&store, "P-1", 1000, 2).await;

    let mut tx = store.begin().await.unwrap();
    let err = tx
        .adjust_stock(&ProductId::new("P-1"), -3)
        .await
        .unwrap_err();
    assert_eq!(err.constraint(), Some("products_stock_non_negative"));
}

#[tokio::test]
async fn delete_removes_dependents_then_header() {
    let store = get_test_store().await;
    insert_product(&store, "P-1", 1000, 10).await;
    let order = test_order("C-1");

    let mut tx = store.begin().await.unwrap();
    tx.insert_order(&order).await.unwrap();
    tx.insert_order_item(&test_item(order.order_id, 1, "P-1", 1))
        .await
        .unwrap();
    tx.insert_order_item(&test_item(order.order_id, 2, "P-1", 1))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let removed = tx.delete_dependents(order.order_id).await.unwrap();
    assert_eq!(removed.items, 2);
    assert_eq!(removed.payments, 0);
    let deleted = tx.delete_order(order.order_id).await.unwrap();
    assert_eq!(deleted.map(|o| o.order_id), Some(order.order_id));
    tx.commit().await.unwrap();

    let mut tx = store.begin_snapshot().await.unwrap();
    assert!(tx.find_order(order.order_id).await.unwrap().is_none());
    assert!(tx.order_items(order.order_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_of_missing_order_returns_none() {
    let store = get_test_store().await;

    let mut tx = store.begin().await.unwrap();
    assert!(tx.delete_order(OrderId::new()).await.unwrap().is_none());
    tx.rollback().await.unwrap();
}

#[tokio::test]
async fn header_update_persists_fields() {
    let store = get_test_store().await;
    let mut order = test_order("C-1");

    let mut tx = store.begin().await.unwrap();
    tx.insert_order(&order).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let locked = tx.lock_order(order.order_id).await.unwrap();
    assert!(locked.is_some());
    order.status = OrderStatus::Shipped;
    order.approved_at = Some(Utc::now());
    order.delivered_carrier_at = Some(Utc::now());
    order.invoice_no = Some("INV-2".to_string());
    tx.update_order(&order).await.unwrap();
    tx.commit().await.unwrap();

    let stored = read_order(&store, order.order_id).await.unwrap();
    assert_eq!(stored.status, OrderStatus::Shipped);
    assert_eq!(stored.invoice_no.as_deref(), Some("INV-2"));
    assert!(stored.approved_at.is_some());
    assert!(stored.delivered_carrier_at.is_some());
    assert!(stored.delivered_at.is_none());
}

#[tokio::test]
async fn product_lock_blocks_second_transaction() {
    let store = get_test_store().await;
    insert_product(&store, "P-1", 1000, 5).await;
    let product_id = ProductId::new("P-1");

    let mut first = store.begin().await.unwrap();
    first.lock_product(&product_id).await.unwrap().unwrap();

    let contender = {
        let store = store.clone();
        let product_id = product_id.clone();
        tokio::spawn(async move {
            let mut second = store.begin().await.unwrap();
            let product = second.lock_product(&product_id).await.unwrap().unwrap();
            second.commit().await.unwrap();
            product.stock_quantity
        })
    };

    // The contender must wait on the row lock held by `first`
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!contender.is_finished());

    first.adjust_stock(&product_id, -4).await.unwrap();
    first.commit().await.unwrap();

    let seen = contender.await.unwrap();
    assert_eq!(seen, 1);
}

#[tokio::test]
async fn snapshot_does_not_see_later_commits() {
    let store = get_test_store().await;
    insert_product(&store, "P-1", 1000, 10).await;
    let order = test_order("C-1");

    let mut tx = store.begin().await.unwrap();
    tx.insert_order(&order).await.unwrap();
    tx.insert_order_item(&test_item(order.order_id, 1, "P-1", 2))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut snapshot = store.begin_snapshot().await.unwrap();
    assert!(snapshot.find_order(order.order_id).await.unwrap().is_some());

    let mut cancel = store.begin().await.unwrap();
    cancel.delete_dependents(order.order_id).await.unwrap();
    cancel.delete_order(order.order_id).await.unwrap();
    cancel.commit().await.unwrap();

    let items = snapshot.order_items(order.order_id).await.unwrap();
    assert_eq!(items.len(), 1);
    snapshot.commit().await.unwrap();

    assert!(read_order(&store, order.order_id).await.is_none());
}

#[tokio::test]
async fn snapshot_rejects_writes() {
    let store = get_test_store().await;

    let mut snapshot = store.begin_snapshot().await.unwrap();
    let err = snapshot.insert_order(&test_order("C-1")).await.unwrap_err();
    assert!(matches!(err, StoreError::Database(_)));
}
