use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    config::AppConfig,
    events::EventSender,
    services::{
        audit::AuditService, inventory::InventoryService, po_status::PurchaseOrderStatusService,
        purchase_orders::PurchaseOrderService, receiving::ReceivingService,
    },
};

pub mod common;
pub mod health;
pub mod inventory;
pub mod purchase_orders;
pub mod vendors;

pub use crate::AppState;

/// The service layer, built once at startup and shared through `AppState`.
#[derive(Clone)]
pub struct AppServices {
    pub purchase_orders: PurchaseOrderService,
    pub receiving: ReceivingService,
    pub status: PurchaseOrderStatusService,
    pub inventory: InventoryService,
    pub audit: AuditService,
}

impl AppServices {
    pub fn build(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        config: &AppConfig,
    ) -> Self {
        let inventory = InventoryService::new(db.clone());
        let audit = AuditService::new(db.clone());
        let receiving = ReceivingService::new(
            db.clone(),
            inventory.clone(),
            audit.clone(),
            event_sender.clone(),
            config.allow_over_receipt,
        );

        Self {
            purchase_orders: PurchaseOrderService::new(db.clone(), event_sender.clone()),
            status: PurchaseOrderStatusService::new(db.clone(), event_sender),
            receiving,
            inventory,
            audit,
        }
    }
}
