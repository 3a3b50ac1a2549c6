use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    CancelOrder, CreateOrder, Money, OrderLifecycleManager, OrderLine, OrderStatus, PaymentLine,
    UpdateStatus,
};
use store::{InMemoryOrderStore, ProductRecord};

async fn seeded_manager(stock: i32) -> OrderLifecycleManager<InMemoryOrderStore> {
    let store = InMemoryOrderStore::new();
    store.insert_customer("C-BENCH").await;
    for id in ["P-1", "P-2", "P-3"] {
        store
            .insert_product(ProductRecord::new(id, Money::from_cents(1000), stock))
            .await;
    }
    OrderLifecycleManager::new(store)
}

fn three_line_order() -> CreateOrder {
    CreateOrder::new(
        "C-BENCH",
        vec![
            OrderLine::new("P-1", 1),
            OrderLine::new("P-2", 2),
            OrderLine::new("P-3", 1),
        ],
    )
    .with_payment(PaymentLine::new(1, "credit_card", 1, Money::from_cents(4000)))
}

fn bench_create_order(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let manager = rt.block_on(seeded_manager(i32::MAX));

    c.bench_function("lifecycle/create_order", |b| {
        b.iter(|| {
            rt.block_on(async {
                manager.create_order(three_line_order()).await.unwrap();
            });
        });
    });
}

fn bench_create_and_cancel(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let manager = rt.block_on(seeded_manager(100));

    c.bench_function("lifecycle/create_then_cancel", |b| {
        b.iter(|| {
            rt.block_on(async {
                let created = manager.create_order(three_line_order()).await.unwrap();
                manager
                    .cancel_order(CancelOrder::new(created.order.order_id))
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_status_walk(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let manager = rt.block_on(seeded_manager(i32::MAX));

    c.bench_function("lifecycle/create_approve_ship_deliver", |b| {
        b.iter(|| {
            rt.block_on(async {
                let created = manager.create_order(three_line_order()).await.unwrap();
                let order_id = created.order.order_id;
                for status in [
                    OrderStatus::Approved,
                    OrderStatus::Shipped,
                    OrderStatus::Delivered,
                ] {
                    manager
                        .update_status(UpdateStatus::new(order_id, status))
                        .await
                        .unwrap();
                }
            });
        });
    });
}

criterion_group!(
    benches,
    bench_create_order,
    bench_create_and_cancel,
    bench_status_walk
);
criterion_main!(benches);
