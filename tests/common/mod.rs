use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ActiveValue::Set};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use opsboard_api::{
    config::AppConfig,
    db,
    entities::{product, purchase_order, purchase_order_item, vendor},
    events::{self, EventSender},
    handlers::AppServices,
    services::po_status::PurchaseOrderStatus,
    AppState,
};

/// Harness spinning up app state backed by a throwaway SQLite database.
/// One connection keeps every query on the same database file.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
    _db_dir: tempfile::TempDir,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_dir = tempfile::tempdir().expect("create temp dir for test database");
        let db_path = db_dir.path().join("opsboard_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::build(db_arc.clone(), event_sender.clone(), &cfg);

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        let router = Router::new()
            .nest("/api/v1", opsboard_api::api_v1_routes())
            .with_state(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
            _db_dir: db_dir,
        }
    }

    /// Enables the over-receipt escape hatch; rebuilds services so the
    /// receiving coordinator picks up the new policy.
    pub async fn with_over_receipt() -> Self {
        let mut app = Self::new().await;
        app.state.config.allow_over_receipt = true;
        app.state.services = AppServices::build(
            app.state.db.clone(),
            app.state.event_sender.clone(),
            &app.state.config,
        );
        app.router = Router::new()
            .nest("/api/v1", opsboard_api::api_v1_routes())
            .with_state(app.state.clone());
        app
    }

    /// Sends a JSON request through the router and returns status + parsed body.
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                builder
                    .body(Body::from(json.to_string()))
                    .expect("build request")
            }
            None => builder.body(Body::empty()).expect("build request"),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router call failed");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read response body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                // Non-JSON bodies (e.g. axum extractor rejections) come back
                // as plain text; surface them as a JSON string.
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        (status, json)
    }
}

pub async fn seed_vendor(app: &TestApp, name: &str) -> vendor::Model {
    let model = vendor::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        contact_email: Set(Some(format!(
            "{}@example.com",
            name.to_lowercase().replace(' ', ".")
        ))),
        created_at: Set(Utc::now()),
    };
    model.insert(&*app.state.db).await.expect("seed vendor")
}

pub async fn seed_product(
    app: &TestApp,
    name: &str,
    sku: &str,
    reorder_threshold: Option<i32>,
) -> product::Model {
    let now = Utc::now();
    let model = product::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        sku: Set(sku.to_string()),
        unit_cost: Set(dec!(9.95)),
        stock_quantity: Set(0),
        reorder_threshold: Set(reorder_threshold),
        created_at: Set(now),
        updated_at: Set(now),
    };
    model.insert(&*app.state.db).await.expect("seed product")
}

/// Inserts a purchase order directly, bypassing the service layer, so tests
/// can start from any status.
pub async fn seed_order(
    app: &TestApp,
    vendor_id: Uuid,
    status: PurchaseOrderStatus,
    items: &[(Uuid, i32)],
) -> (purchase_order::Model, Vec<purchase_order_item::Model>) {
    let now = Utc::now();
    let order = purchase_order::ActiveModel {
        id: Set(Uuid::new_v4()),
        vendor_id: Set(vendor_id),
        status: Set(status.to_string()),
        ordered_at: Set(Some(now)),
        received_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let order = order.insert(&*app.state.db).await.expect("seed order");

    let mut rows = Vec::new();
    for (product_id, quantity_ordered) in items {
        let row = purchase_order_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            purchase_order_id: Set(order.id),
            product_id: Set(*product_id),
            quantity_ordered: Set(*quantity_ordered),
            quantity_received: Set(0),
            cost_per_item: Set(dec!(12.50)),
            created_at: Set(now),
        };
        rows.push(row.insert(&*app.state.db).await.expect("seed order item"));
    }

    (order, rows)
}
