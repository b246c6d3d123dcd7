mod common;

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use common::{seed_product, seed_vendor, TestApp};

#[tokio::test]
async fn create_requires_at_least_one_item() {
    let app = TestApp::new().await;
    let vendor = seed_vendor(&app, "Acme Supply").await;

    let (status, _) = app
        .request(
            "POST",
            "/api/v1/purchase-orders",
            Some(json!({ "vendor_id": vendor.id, "items": [] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_rejects_unknown_vendor_and_product() {
    let app = TestApp::new().await;
    let vendor = seed_vendor(&app, "Acme Supply").await;
    let widget = seed_product(&app, "Widget", "WID-201", None).await;

    let (status, _) = app
        .request(
            "POST",
            "/api/v1/purchase-orders",
            Some(json!({
                "vendor_id": Uuid::new_v4(),
                "items": [
                    { "product_id": widget.id, "quantity_ordered": 1, "cost_per_item": "1.00" }
                ]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .request(
            "POST",
            "/api/v1/purchase-orders",
            Some(json!({
                "vendor_id": vendor.id,
                "items": [
                    { "product_id": Uuid::new_v4(), "quantity_ordered": 1, "cost_per_item": "1.00" }
                ]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_returns_orders_newest_first() {
    let app = TestApp::new().await;
    let vendor = seed_vendor(&app, "Acme Supply").await;
    let widget = seed_product(&app, "Widget", "WID-202", None).await;

    let mut ids = Vec::new();
    for _ in 0..2 {
        let (status, body) = app
            .request(
                "POST",
                "/api/v1/purchase-orders",
                Some(json!({
                    "vendor_id": vendor.id,
                    "items": [
                        { "product_id": widget.id, "quantity_ordered": 2, "cost_per_item": "3.00" }
                    ]
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        ids.push(body["data"]["id"].as_str().expect("id").to_string());
        // created_at has second-level granularity on some backends
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    }

    let (status, body) = app.request("GET", "/api/v1/purchase-orders", None).await;
    assert_eq!(status, StatusCode::OK);
    let orders = body["data"].as_array().expect("array");
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0]["id"], ids[1].as_str(), "newest first");
    assert_eq!(orders[1]["id"], ids[0].as_str());
}

#[tokio::test]
async fn get_unknown_order_returns_404() {
    let app = TestApp::new().await;
    let (status, _) = app
        .request(
            "GET",
            &format!("/api/v1/purchase-orders/{}", Uuid::new_v4()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn vendors_are_listed_by_name() {
    let app = TestApp::new().await;
    seed_vendor(&app, "Zeta Parts").await;
    seed_vendor(&app, "Acme Supply").await;

    let (status, body) = app.request("GET", "/api/v1/vendors", None).await;
    assert_eq!(status, StatusCode::OK);
    let vendors = body["data"].as_array().expect("array");
    assert_eq!(vendors.len(), 2);
    assert_eq!(vendors[0]["name"], "Acme Supply");
    assert_eq!(vendors[1]["name"], "Zeta Parts");
}
