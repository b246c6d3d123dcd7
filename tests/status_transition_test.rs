mod common;

use axum::http::StatusCode;
use sea_orm::EntityTrait;
use serde_json::json;

use common::{seed_order, seed_product, seed_vendor, TestApp};
use opsboard_api::{
    entities::purchase_order, errors::ServiceError, services::po_status::PurchaseOrderStatus,
};

#[tokio::test]
async fn ordering_a_pending_order_stamps_ordered_at() {
    let app = TestApp::new().await;
    let vendor = seed_vendor(&app, "Acme Supply").await;
    let widget = seed_product(&app, "Widget", "WID-101", None).await;

    let view = app
        .state
        .services
        .purchase_orders
        .create_purchase_order(
            vendor.id,
            vec![opsboard_api::services::purchase_orders::NewOrderItem {
                product_id: widget.id,
                quantity_ordered: 3,
                cost_per_item: rust_decimal_macros::dec!(5.00),
            }],
        )
        .await
        .expect("create order");
    assert_eq!(view.status, PurchaseOrderStatus::Pending);
    assert!(view.ordered_at.is_none());

    let updated = app
        .state
        .services
        .status
        .set_status(view.id, PurchaseOrderStatus::Ordered)
        .await
        .expect("pending -> ordered");
    assert_eq!(updated.status, "ORDERED");
    assert!(updated.ordered_at.is_some());
}

#[tokio::test]
async fn receipt_statuses_cannot_be_set_manually() {
    let app = TestApp::new().await;
    let vendor = seed_vendor(&app, "Acme Supply").await;
    let widget = seed_product(&app, "Widget", "WID-102", None).await;
    let (order, _) = seed_order(
        &app,
        vendor.id,
        PurchaseOrderStatus::Ordered,
        &[(widget.id, 5)],
    )
    .await;

    for target in ["RECEIVED", "PARTIALLY_RECEIVED"] {
        let (status, _) = app
            .request(
                "PUT",
                &format!("/api/v1/purchase-orders/{}/status", order.id),
                Some(json!({ "status": target })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "manual {} must fail", target);
    }
}

#[tokio::test]
async fn cancel_and_reopen_round_trip() {
    let app = TestApp::new().await;
    let vendor = seed_vendor(&app, "Acme Supply").await;
    let widget = seed_product(&app, "Widget", "WID-103", None).await;
    let (order, _) = seed_order(
        &app,
        vendor.id,
        PurchaseOrderStatus::Ordered,
        &[(widget.id, 5)],
    )
    .await;

    app.state
        .services
        .status
        .set_status(order.id, PurchaseOrderStatus::Cancelled)
        .await
        .expect("ordered -> cancelled");

    let err = app
        .state
        .services
        .status
        .set_status(order.id, PurchaseOrderStatus::Ordered)
        .await
        .expect_err("cancelled -> ordered is not allowed");
    assert!(matches!(err, ServiceError::ValidationError(_)));

    app.state
        .services
        .status
        .set_status(order.id, PurchaseOrderStatus::Pending)
        .await
        .expect("cancelled -> pending reopens");

    let current = app
        .state
        .services
        .status
        .get_status(order.id)
        .await
        .expect("get status");
    assert_eq!(current, PurchaseOrderStatus::Pending);
}

#[tokio::test]
async fn received_orders_are_final() {
    let app = TestApp::new().await;
    let vendor = seed_vendor(&app, "Acme Supply").await;
    let widget = seed_product(&app, "Widget", "WID-104", None).await;
    let (order, _) = seed_order(
        &app,
        vendor.id,
        PurchaseOrderStatus::Received,
        &[(widget.id, 5)],
    )
    .await;

    let err = app
        .state
        .services
        .status
        .set_status(order.id, PurchaseOrderStatus::Cancelled)
        .await
        .expect_err("received orders cannot be cancelled");
    assert!(matches!(err, ServiceError::ValidationError(_)));

    let row = purchase_order::Entity::find_by_id(order.id)
        .one(&*app.state.db)
        .await
        .expect("query order")
        .expect("order exists");
    assert_eq!(row.status, "RECEIVED");
}

#[tokio::test]
async fn unknown_status_value_is_a_bad_request() {
    let app = TestApp::new().await;
    let vendor = seed_vendor(&app, "Acme Supply").await;
    let widget = seed_product(&app, "Widget", "WID-105", None).await;
    let (order, _) = seed_order(
        &app,
        vendor.id,
        PurchaseOrderStatus::Pending,
        &[(widget.id, 5)],
    )
    .await;

    let (status, _) = app
        .request(
            "PUT",
            &format!("/api/v1/purchase-orders/{}/status", order.id),
            Some(json!({ "status": "SHIPPED" })),
        )
        .await;
    // Serde rejects the unknown enum value before the handler runs.
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
