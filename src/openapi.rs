use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    errors::ErrorResponse,
    handlers,
    services::{po_status::PurchaseOrderStatus, purchase_orders, receiving},
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "OpsBoard API",
        description = r#"
Purchase order receiving and fulfillment engine.

Shipments are received atomically: line item quantities, traceable inventory
lots, aggregate stock counters, and the order status all move in one
transaction or not at all. Partial deliveries are first-class; a purchase
order reaches `RECEIVED` only when every line has been covered.
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "purchase-orders", description = "Purchase order placement, receiving, and status"),
        (name = "inventory", description = "Inventory lots and stock projections"),
        (name = "vendors", description = "Vendor directory")
    ),
    paths(
        handlers::purchase_orders::create_purchase_order,
        handlers::purchase_orders::list_purchase_orders,
        handlers::purchase_orders::get_purchase_order,
        handlers::purchase_orders::receive_shipment,
        handlers::purchase_orders::update_status,
        handlers::inventory::low_stock,
        handlers::inventory::lots_for_product,
        handlers::vendors::list_vendors,
    ),
    components(schemas(
        ErrorResponse,
        PurchaseOrderStatus,
        handlers::purchase_orders::CreatePurchaseOrderRequest,
        handlers::purchase_orders::PurchaseOrderItemRequest,
        handlers::purchase_orders::ReceiveShipmentRequest,
        handlers::purchase_orders::ReceiveShipmentLine,
        handlers::purchase_orders::UpdateStatusRequest,
        handlers::inventory::LowStockProduct,
        handlers::inventory::InventoryLotView,
        purchase_orders::PurchaseOrderView,
        purchase_orders::OrderItemView,
        purchase_orders::VendorView,
        purchase_orders::NewOrderItem,
        receiving::ReceiveLineRequest,
        receiving::ReceiptSummary,
    ))
)]
pub struct ApiDoc;

/// Swagger UI router, served at `/docs` with the spec at `/api-docs/openapi.json`.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
