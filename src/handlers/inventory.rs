use super::common::{map_service_error, success_response};
use crate::{errors::ApiError, handlers::AppState, ApiResponse};
use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{inventory_lot, product};

#[derive(Debug, Serialize, ToSchema)]
pub struct LowStockProduct {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub unit_cost: Decimal,
    pub stock_quantity: i32,
    pub reorder_threshold: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryLotView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity_received: i32,
    pub quantity_remaining: i32,
    pub expiration_date: Option<NaiveDate>,
    pub received_at: DateTime<Utc>,
}

impl From<inventory_lot::Model> for InventoryLotView {
    fn from(lot: inventory_lot::Model) -> Self {
        Self {
            id: lot.id,
            product_id: lot.product_id,
            quantity_received: lot.quantity_received,
            quantity_remaining: lot.quantity_remaining,
            expiration_date: lot.expiration_date,
            received_at: lot.received_at,
        }
    }
}

/// Products at or below their reorder threshold
#[utoipa::path(
    get,
    path = "/api/v1/inventory/low-stock",
    responses(
        (status = 200, description = "Low stock products returned", body = crate::ApiResponse<Vec<LowStockProduct>>)
    ),
    tag = "inventory"
)]
pub async fn low_stock(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let products = state
        .services
        .inventory
        .low_stock_products()
        .await
        .map_err(map_service_error)?;

    let views: Vec<LowStockProduct> = products
        .into_iter()
        .filter_map(|p: product::Model| {
            // The query only returns rows with a threshold set.
            p.reorder_threshold.map(|threshold| LowStockProduct {
                id: p.id,
                name: p.name,
                sku: p.sku,
                unit_cost: p.unit_cost,
                stock_quantity: p.stock_quantity,
                reorder_threshold: threshold,
            })
        })
        .collect();

    Ok(success_response(ApiResponse::success(views)))
}

/// Inventory lots for a product, oldest receipt first
#[utoipa::path(
    get,
    path = "/api/v1/inventory/lots/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Lots returned", body = crate::ApiResponse<Vec<InventoryLotView>>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn lots_for_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let lots = state
        .services
        .inventory
        .lots_for_product(product_id)
        .await
        .map_err(map_service_error)?;

    let views: Vec<InventoryLotView> = lots.into_iter().map(InventoryLotView::from).collect();
    Ok(success_response(ApiResponse::success(views)))
}

/// Creates the router for inventory endpoints
pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/low-stock", get(low_stock))
        .route("/lots/:product_id", get(lots_for_product))
}
