//! Product stock endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use domain::ProductId;
use serde::Serialize;
use store::{OrderStore, ProductRecord};

use super::orders::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct ProductResponse {
    pub product_id: String,
    pub description: Option<String>,
    pub unit_price_cents: i64,
    pub stock_quantity: i32,
}

impl From<ProductRecord> for ProductResponse {
    fn from(product: ProductRecord) -> Self {
        Self {
            product_id: product.product_id.to_string(),
            description: product.description,
            unit_price_cents: product.unit_price.cents(),
            stock_quantity: product.stock_quantity,
        }
    }
}

/// GET /products/{id}: current price and stock of a product.
#[tracing::instrument(skip(state))]
pub async fn get<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state.manager.product(&ProductId::new(id)).await?;
    Ok(Json(product.into()))
}
