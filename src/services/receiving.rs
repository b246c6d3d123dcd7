use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QuerySelect, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::{
        product::{self, Entity as ProductEntity},
        purchase_order::{self, Entity as OrderEntity},
        purchase_order_item::{self, Entity as ItemEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        audit::AuditService,
        inventory::InventoryService,
        po_status::{parse_status, status_after_receipt, PurchaseOrderStatus},
    },
};

/// One line of an inbound shipment against an open purchase order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReceiveLineRequest {
    /// The purchase order item this delivery applies to
    pub item_id: Uuid,
    /// Must match the item's product; a mismatch aborts the whole shipment
    pub product_id: Uuid,
    /// Units delivered now. Zero means the line was untouched and is skipped.
    pub quantity: i32,
    /// Optional batch expiration, carried onto the created lot
    pub expiration_date: Option<NaiveDate>,
}

/// Outcome of a successful receiving operation.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReceiptSummary {
    pub purchase_order_id: Uuid,
    pub status: PurchaseOrderStatus,
    pub total_units_received: i64,
    pub lot_ids: Vec<Uuid>,
}

/// The receiving transaction coordinator. Applies a shipment to a purchase
/// order as one atomic unit: per-line item increments, one inventory lot per
/// non-zero line, matching aggregate stock increments, and the status
/// recompute all commit together or not at all. The order row is locked for
/// the duration, so two shipments against the same order serialize.
#[derive(Clone)]
pub struct ReceivingService {
    db: Arc<DatabaseConnection>,
    inventory: InventoryService,
    audit: AuditService,
    event_sender: EventSender,
    allow_over_receipt: bool,
}

impl ReceivingService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        inventory: InventoryService,
        audit: AuditService,
        event_sender: EventSender,
        allow_over_receipt: bool,
    ) -> Self {
        Self {
            db,
            inventory,
            audit,
            event_sender,
            allow_over_receipt,
        }
    }

    /// Receives a full or partial shipment against a purchase order.
    ///
    /// Rejections (empty/all-zero shipment, unknown order or line item,
    /// terminal order status, over-receipt when disallowed) leave every row
    /// untouched; the audit entry and event are emitted only after commit and
    /// are best-effort.
    #[instrument(skip(self, lines), fields(order_id = %purchase_order_id, line_count = lines.len()))]
    pub async fn receive_shipment(
        &self,
        purchase_order_id: Uuid,
        lines: Vec<ReceiveLineRequest>,
    ) -> Result<ReceiptSummary, ServiceError> {
        if lines.is_empty() {
            return Err(ServiceError::ValidationError(
                "Shipment contains no lines".to_string(),
            ));
        }
        if let Some(bad) = lines.iter().find(|line| line.quantity < 0) {
            return Err(ServiceError::ValidationError(format!(
                "Negative quantity {} for item {}",
                bad.quantity, bad.item_id
            )));
        }
        if lines.iter().all(|line| line.quantity == 0) {
            return Err(ServiceError::ValidationError(
                "Shipment is a no-op: every line quantity is zero".to_string(),
            ));
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(ServiceError::DatabaseError)?;

        let order = OrderEntity::find_by_id(purchase_order_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Purchase order {} not found",
                    purchase_order_id
                ))
            })?;

        let current_status = parse_status(&order.status)?;
        if current_status.is_terminal_for_receiving() {
            return Err(ServiceError::Conflict(format!(
                "Cannot receive against purchase order {} in status {}",
                purchase_order_id, current_status
            )));
        }

        let mut items: HashMap<Uuid, purchase_order_item::Model> = ItemEntity::find()
            .filter(purchase_order_item::Column::PurchaseOrderId.eq(purchase_order_id))
            .all(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .into_iter()
            .map(|item| (item.id, item))
            .collect();

        let mut total_units: i64 = 0;
        let mut lot_ids = Vec::new();
        let mut touched_products: Vec<Uuid> = Vec::new();

        for line in lines.iter().filter(|line| line.quantity > 0) {
            let item = self.apply_line(&txn, &mut items, line).await?;
            if !touched_products.contains(&item.product_id) {
                touched_products.push(item.product_id);
            }

            let lot = self
                .inventory
                .create_lot(&txn, item.product_id, line.quantity, line.expiration_date)
                .await?;
            self.inventory
                .increment_stock(&txn, item.product_id, line.quantity)
                .await?;

            total_units += i64::from(line.quantity);
            lot_ids.push(lot.id);
        }

        // Recompute status from a fresh read of the full item set, inside the
        // same transaction as the quantity updates.
        let updated_items = ItemEntity::find()
            .filter(purchase_order_item::Column::PurchaseOrderId.eq(purchase_order_id))
            .all(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;
        let new_status = status_after_receipt(&updated_items);

        let mut active: purchase_order::ActiveModel = order.into();
        active.status = Set(new_status.to_string());
        active.received_at = Set(Some(Utc::now()));
        active.updated_at = Set(Utc::now());
        active
            .update(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(
            "Received {} units across {} lots against purchase order {} (now {})",
            total_units,
            lot_ids.len(),
            purchase_order_id,
            new_status
        );

        self.audit
            .record(
                "PO_RECEIVE",
                &format!(
                    "Received {} units across {} lots; status is now {}",
                    total_units,
                    lot_ids.len(),
                    new_status
                ),
                &purchase_order_id.to_string(),
                "PurchaseOrder",
            )
            .await;

        self.event_sender
            .send_or_log(Event::PurchaseOrderReceived {
                purchase_order_id,
                total_units,
                lots_created: lot_ids.len(),
                new_status: new_status.to_string(),
            })
            .await;

        self.notify_low_stock(&touched_products).await;

        Ok(ReceiptSummary {
            purchase_order_id,
            status: new_status,
            total_units_received: total_units,
            lot_ids,
        })
    }

    /// Flags received products that are still at or below their reorder
    /// threshold. Post-commit and best-effort, like the audit entry.
    async fn notify_low_stock(&self, product_ids: &[Uuid]) {
        if product_ids.is_empty() {
            return;
        }

        let products = match ProductEntity::find()
            .filter(product::Column::Id.is_in(product_ids.to_vec()))
            .all(&*self.db)
            .await
        {
            Ok(products) => products,
            Err(e) => {
                warn!("Skipping low-stock check after receipt: {}", e);
                return;
            }
        };

        for p in products {
            if let Some(threshold) = p.reorder_threshold {
                if p.stock_quantity <= threshold {
                    self.event_sender
                        .send_or_log(Event::LowStock {
                            product_id: p.id,
                            stock_quantity: p.stock_quantity,
                            reorder_threshold: threshold,
                        })
                        .await;
                }
            }
        }
    }

    /// Validates one non-zero line against the order's items and increments
    /// the matching item's received quantity. The in-memory map is kept
    /// current so repeated lines for the same item validate cumulatively.
    async fn apply_line(
        &self,
        txn: &DatabaseTransaction,
        items: &mut HashMap<Uuid, purchase_order_item::Model>,
        line: &ReceiveLineRequest,
    ) -> Result<purchase_order_item::Model, ServiceError> {
        let item = items.get(&line.item_id).cloned().ok_or_else(|| {
            ServiceError::NotFound(format!(
                "Line item {} does not belong to this purchase order",
                line.item_id
            ))
        })?;

        if item.product_id != line.product_id {
            return Err(ServiceError::ValidationError(format!(
                "Line item {} is for product {}, not {}",
                line.item_id, item.product_id, line.product_id
            )));
        }

        let new_received = item
            .quantity_received
            .checked_add(line.quantity)
            .ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "Quantity {} for item {} overflows the received total",
                    line.quantity, item.id
                ))
            })?;
        if !self.allow_over_receipt && new_received > item.quantity_ordered {
            return Err(ServiceError::ValidationError(format!(
                "Cannot receive more than ordered for item {}. Ordered: {}, already received: {}, trying to receive: {}",
                item.id, item.quantity_ordered, item.quantity_received, line.quantity
            )));
        }

        let mut active: purchase_order_item::ActiveModel = item.into();
        active.quantity_received = Set(new_received);
        let updated = active
            .update(txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        items.insert(updated.id, updated.clone());
        Ok(updated)
    }
}
