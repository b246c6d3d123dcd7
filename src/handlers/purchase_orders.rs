use super::common::{created_response, map_service_error, success_response, validate_input};
use crate::{
    errors::ApiError,
    handlers::AppState,
    services::{
        po_status::PurchaseOrderStatus,
        purchase_orders::NewOrderItem,
        receiving::ReceiveLineRequest,
    },
    ApiResponse,
};
use axum::{
    extract::{Json, Path, State},
    routing::{get, post, put},
    Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// Request DTOs

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePurchaseOrderRequest {
    pub vendor_id: Uuid,
    #[validate(length(min = 1, message = "at least one item is required"))]
    pub items: Vec<PurchaseOrderItemRequest>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct PurchaseOrderItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity_ordered: i32,
    pub cost_per_item: Decimal,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReceiveShipmentRequest {
    #[validate(length(min = 1, message = "at least one line is required"))]
    pub items: Vec<ReceiveShipmentLine>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReceiveShipmentLine {
    pub item_id: Uuid,
    pub product_id: Uuid,
    /// Units delivered for this line; zero lines are skipped
    #[validate(range(min = 0))]
    pub quantity: i32,
    pub expiration_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: PurchaseOrderStatus,
}

// Handler functions

/// Create a new purchase order
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders",
    request_body = CreatePurchaseOrderRequest,
    responses(
        (status = 201, description = "Purchase order created", body = crate::ApiResponse<crate::services::purchase_orders::PurchaseOrderView>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Vendor or product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn create_purchase_order(
    State(state): State<AppState>,
    Json(payload): Json<CreatePurchaseOrderRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let items = payload
        .items
        .into_iter()
        .map(|item| NewOrderItem {
            product_id: item.product_id,
            quantity_ordered: item.quantity_ordered,
            cost_per_item: item.cost_per_item,
        })
        .collect();

    let view = state
        .services
        .purchase_orders
        .create_purchase_order(payload.vendor_id, items)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(ApiResponse::success(view)))
}

/// List all purchase orders, newest first
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders",
    responses(
        (status = 200, description = "Purchase orders returned", body = crate::ApiResponse<Vec<crate::services::purchase_orders::PurchaseOrderView>>)
    ),
    tag = "purchase-orders"
)]
pub async fn list_purchase_orders(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let views = state
        .services
        .purchase_orders
        .list_purchase_orders()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(views)))
}

/// Get a purchase order with vendor and items
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{id}",
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order returned", body = crate::ApiResponse<crate::services::purchase_orders::PurchaseOrderView>),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn get_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let view = state
        .services
        .purchase_orders
        .get_purchase_order(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(view)))
}

/// Receive a full or partial shipment against a purchase order
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/receive",
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    request_body = ReceiveShipmentRequest,
    responses(
        (status = 200, description = "Shipment received", body = crate::ApiResponse<crate::services::receiving::ReceiptSummary>),
        (status = 400, description = "Invalid shipment", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order or line item not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order is cancelled or fully received", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn receive_shipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReceiveShipmentRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let lines = payload
        .items
        .into_iter()
        .map(|line| ReceiveLineRequest {
            item_id: line.item_id,
            product_id: line.product_id,
            quantity: line.quantity,
            expiration_date: line.expiration_date,
        })
        .collect();

    let summary = state
        .services
        .receiving
        .receive_shipment(id, lines)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(summary)))
}

/// Manually transition a purchase order's status
#[utoipa::path(
    put,
    path = "/api/v1/purchase-orders/{id}/status",
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let updated = state
        .services
        .status
        .set_status(id, payload.status)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(serde_json::json!({
        "id": updated.id,
        "status": updated.status,
        "updated_at": updated.updated_at,
    }))))
}

/// Creates the router for purchase order endpoints
pub fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_purchase_order).get(list_purchase_orders))
        .route("/:id", get(get_purchase_order))
        .route("/:id/receive", post(receive_shipment))
        .route("/:id/status", put(update_status))
}
