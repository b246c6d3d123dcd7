use super::common::{map_service_error, success_response};
use crate::{errors::ApiError, handlers::AppState, ApiResponse};
use axum::{extract::State, routing::get, Router};

/// List all vendors, by name
#[utoipa::path(
    get,
    path = "/api/v1/vendors",
    responses(
        (status = 200, description = "Vendors returned", body = crate::ApiResponse<Vec<crate::services::purchase_orders::VendorView>>)
    ),
    tag = "vendors"
)]
pub async fn list_vendors(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let vendors = state
        .services
        .purchase_orders
        .list_vendors()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(vendors)))
}

/// Creates the router for vendor endpoints
pub fn vendor_routes() -> Router<AppState> {
    Router::new().route("/", get(list_vendors))
}
