//! HTTP API server for the order lifecycle service.
//!
//! Provides REST endpoints for creating, updating, cancelling and deleting
//! orders, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod seed;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use metrics_exporter_prometheus::PrometheusHandle;
use store::OrderStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: OrderStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route("/orders", post(routes::orders::create::<S>))
        .route(
            "/orders/{id}",
            get(routes::orders::get::<S>)
                .put(routes::orders::update::<S>)
                .delete(routes::orders::delete::<S>),
        )
        .route("/orders/{id}/items", get(routes::orders::items::<S>))
        .route("/orders/{id}/payments", get(routes::orders::payments::<S>))
        .route("/orders/{id}/reviews", get(routes::orders::reviews::<S>))
        .route(
            "/orders/{id}/status",
            patch(routes::orders::update_status::<S>),
        )
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S>))
        .route("/products/{id}", get(routes::products::get::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Registers descriptions for the metrics emitted by the lifecycle manager.
pub fn describe_metrics() {
    metrics::describe_counter!("orders_created_total", "Orders committed");
    metrics::describe_counter!(
        "orders_create_failed_total",
        "Order creations rejected or failed, by reason"
    );
    metrics::describe_counter!("orders_cancelled_total", "Orders cancelled with stock restored");
    metrics::describe_counter!("orders_deleted_total", "Orders deleted without stock restore");
    metrics::describe_counter!("order_status_updates_total", "Status changes, by new status");
    metrics::describe_counter!("order_updates_total", "Order header edits");
    metrics::describe_histogram!(
        "order_create_duration_seconds",
        metrics::Unit::Seconds,
        "Time to create an order, including the store transaction"
    );
}
