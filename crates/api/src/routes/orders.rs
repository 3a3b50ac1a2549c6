//! Order lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use domain::{
    CancelOrder, CancelledOrder, CreateOrder, DeleteOrder, DeletedOrder, Money, OrderDetails,
    OrderId, OrderLifecycleManager, OrderLine, OrderStatus, PaymentLine, ReviewLine, UpdateOrder,
    UpdateStatus,
};
use serde::{Deserialize, Serialize};
use store::{
    OrderItemRecord, OrderRecord, OrderStore, PaymentRecord, RemovedDependents, ReviewRecord,
};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: OrderStore> {
    pub manager: OrderLifecycleManager<S>,
}

impl<S: OrderStore> AppState<S> {
    pub fn new(store: S) -> Self {
        Self {
            manager: OrderLifecycleManager::new(store),
        }
    }
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub customer_id: String,
    pub invoice_no: Option<String>,
    pub status: Option<String>,
    pub estimated_delivery_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<OrderItemRequest>,
    #[serde(default)]
    pub payments: Vec<PaymentRequest>,
    #[serde(default)]
    pub reviews: Vec<ReviewRequest>,
}

#[derive(Deserialize)]
pub struct OrderItemRequest {
    pub product_id: String,
    pub quantity: i32,
    /// Overrides the product's current price when present.
    pub unit_price_cents: Option<i64>,
}

#[derive(Deserialize)]
pub struct PaymentRequest {
    pub payment_sequential: i32,
    pub payment_type: String,
    #[serde(default = "default_installments")]
    pub payment_installments: i32,
    pub payment_value_cents: i64,
}

fn default_installments() -> i32 {
    1
}

#[derive(Deserialize)]
pub struct ReviewRequest {
    pub review_score: i16,
    pub review_comment_title: Option<String>,
    pub review_comment_message: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Header edits. Absent fields keep their stored value.
#[derive(Deserialize)]
pub struct UpdateOrderRequest {
    pub invoice_no: Option<String>,
    pub estimated_delivery_at: Option<DateTime<Utc>>,
    pub delivered_carrier_at: Option<DateTime<Utc>>,
}

impl CreateOrderRequest {
    fn into_command(self) -> Result<CreateOrder, ApiError> {
        let items = self
            .items
            .into_iter()
            .map(|item| match item.unit_price_cents {
                Some(cents) => {
                    OrderLine::with_price(item.product_id, item.quantity, Money::from_cents(cents))
                }
                None => OrderLine::new(item.product_id, item.quantity),
            })
            .collect();

        let mut cmd = CreateOrder::new(self.customer_id, items);
        cmd.invoice_no = self.invoice_no;
        cmd.estimated_delivery_at = self.estimated_delivery_at;
        if let Some(status) = self.status {
            cmd.status = Some(parse_status(&status)?);
        }

        cmd.payments = self
            .payments
            .into_iter()
            .map(|p| {
                PaymentLine::new(
                    p.payment_sequential,
                    p.payment_type,
                    p.payment_installments,
                    Money::from_cents(p.payment_value_cents),
                )
            })
            .collect();

        cmd.reviews = self
            .reviews
            .into_iter()
            .map(|r| ReviewLine {
                review_score: r.review_score,
                review_comment_title: r.review_comment_title,
                review_comment_message: r.review_comment_message,
            })
            .collect();

        Ok(cmd)
    }
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub order_id: String,
    pub customer_id: String,
    pub invoice_no: Option<String>,
    pub status: OrderStatus,
    pub total_amount_cents: i64,
    pub total_items: i32,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub delivered_carrier_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub estimated_delivery_at: Option<DateTime<Utc>>,
}

impl From<OrderRecord> for OrderResponse {
    fn from(order: OrderRecord) -> Self {
        Self {
            order_id: order.order_id.to_string(),
            customer_id: order.customer_id.to_string(),
            invoice_no: order.invoice_no,
            status: order.status,
            total_amount_cents: order.total_amount.cents(),
            total_items: order.total_items,
            created_at: order.created_at,
            approved_at: order.approved_at,
            delivered_carrier_at: order.delivered_carrier_at,
            delivered_at: order.delivered_at,
            estimated_delivery_at: order.estimated_delivery_at,
        }
    }
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub order_item_id: i32,
    pub product_id: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

impl From<OrderItemRecord> for OrderItemResponse {
    fn from(item: OrderItemRecord) -> Self {
        Self {
            order_item_id: item.order_item_id,
            product_id: item.product_id.to_string(),
            quantity: item.quantity,
            unit_price_cents: item.unit_price.cents(),
            line_total_cents: item.line_total.cents(),
        }
    }
}

#[derive(Serialize)]
pub struct PaymentResponse {
    pub payment_sequential: i32,
    pub payment_type: String,
    pub payment_installments: i32,
    pub payment_value_cents: i64,
}

impl From<PaymentRecord> for PaymentResponse {
    fn from(payment: PaymentRecord) -> Self {
        Self {
            payment_sequential: payment.payment_sequential,
            payment_type: payment.payment_type,
            payment_installments: payment.payment_installments,
            payment_value_cents: payment.payment_value.cents(),
        }
    }
}

#[derive(Serialize)]
pub struct ReviewResponse {
    pub review_id: String,
    pub review_score: i16,
    pub review_comment_title: Option<String>,
    pub review_comment_message: Option<String>,
    pub review_creation_date: DateTime<Utc>,
    pub review_answer_timestamp: Option<DateTime<Utc>>,
}

impl From<ReviewRecord> for ReviewResponse {
    fn from(review: ReviewRecord) -> Self {
        Self {
            review_id: review.review_id.to_string(),
            review_score: review.review_score,
            review_comment_title: review.review_comment_title,
            review_comment_message: review.review_comment_message,
            review_creation_date: review.review_creation_date,
            review_answer_timestamp: review.review_answer_timestamp,
        }
    }
}

#[derive(Serialize)]
pub struct OrderDetailsResponse {
    #[serde(flatten)]
    pub order: OrderResponse,
    pub items: Vec<OrderItemResponse>,
    pub payments: Vec<PaymentResponse>,
    pub reviews: Vec<ReviewResponse>,
}

impl From<OrderDetails> for OrderDetailsResponse {
    fn from(details: OrderDetails) -> Self {
        Self {
            order: details.order.into(),
            items: details.items.into_iter().map(Into::into).collect(),
            payments: details.payments.into_iter().map(Into::into).collect(),
            reviews: details.reviews.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Serialize)]
pub struct RestoredStockResponse {
    pub product_id: String,
    pub quantity: i32,
}

#[derive(Serialize)]
pub struct CancelledOrderResponse {
    pub order: OrderResponse,
    pub restored_stock: Vec<RestoredStockResponse>,
    pub removed: RemovedDependents,
}

impl From<CancelledOrder> for CancelledOrderResponse {
    fn from(cancelled: CancelledOrder) -> Self {
        Self {
            order: cancelled.order.into(),
            restored_stock: cancelled
                .restored_stock
                .into_iter()
                .map(|r| RestoredStockResponse {
                    product_id: r.product_id.to_string(),
                    quantity: r.quantity,
                })
                .collect(),
            removed: cancelled.removed,
        }
    }
}

#[derive(Serialize)]
pub struct DeletedOrderResponse {
    pub order: OrderResponse,
    pub removed: RemovedDependents,
}

impl From<DeletedOrder> for DeletedOrderResponse {
    fn from(deleted: DeletedOrder) -> Self {
        Self {
            order: deleted.order.into(),
            removed: deleted.removed,
        }
    }
}

// -- Handlers --

/// POST /orders: create an order, taking its quantities out of stock.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    req: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderDetailsResponse>), ApiError> {
    let Json(req) = req?;
    let cmd = req.into_command()?;
    let details = state.manager.create_order(cmd).await?;
    Ok((StatusCode::CREATED, Json(details.into())))
}

/// GET /orders/{id}: load an order with its items, payments and reviews.
#[tracing::instrument(skip(state))]
pub async fn get<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderDetailsResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let details = state
        .manager
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;

    Ok(Json(details.into()))
}

/// GET /orders/{id}/items
#[tracing::instrument(skip(state))]
pub async fn items<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<OrderItemResponse>>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let items = state.manager.order_items(order_id).await?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}

/// GET /orders/{id}/payments
#[tracing::instrument(skip(state))]
pub async fn payments<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<PaymentResponse>>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let payments = state.manager.order_payments(order_id).await?;
    Ok(Json(payments.into_iter().map(Into::into).collect()))
}

/// GET /orders/{id}/reviews
#[tracing::instrument(skip(state))]
pub async fn reviews<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ReviewResponse>>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let reviews = state.manager.order_reviews(order_id).await?;
    Ok(Json(reviews.into_iter().map(Into::into).collect()))
}

/// PUT /orders/{id}: edit the invoice number and delivery dates.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    req: Result<Json<UpdateOrderRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let Json(req) = req?;

    let cmd = UpdateOrder {
        order_id,
        invoice_no: req.invoice_no,
        estimated_delivery_at: req.estimated_delivery_at,
        delivered_carrier_at: req.delivered_carrier_at,
    };
    let order = state.manager.update_order(cmd).await?;

    Ok(Json(order.into()))
}

/// PATCH /orders/{id}/status: change status only; items and stock are untouched.
#[tracing::instrument(skip(state, req))]
pub async fn update_status<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    req: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let Json(req) = req?;
    let status = parse_status(&req.status)?;

    let order = state
        .manager
        .update_status(UpdateStatus::new(order_id, status))
        .await?;

    Ok(Json(order.into()))
}

/// POST /orders/{id}/cancel: restore stock and delete the order.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<CancelledOrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let cancelled = state.manager.cancel_order(CancelOrder::new(order_id)).await?;
    Ok(Json(cancelled.into()))
}

/// DELETE /orders/{id}: delete the order without restoring stock.
#[tracing::instrument(skip(state))]
pub async fn delete<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<DeletedOrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let deleted = state.manager.delete_order(DeleteOrder::new(order_id)).await?;
    Ok(Json(deleted.into()))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}

fn parse_status(status: &str) -> Result<OrderStatus, ApiError> {
    status
        .parse()
        .map_err(|e: common::ParseStatusError| ApiError::BadRequest(e.to_string()))
}
