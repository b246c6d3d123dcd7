use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    ModelTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::{
        product::Entity as ProductEntity,
        purchase_order::{self, Entity as OrderEntity},
        purchase_order_item::{self, Entity as ItemEntity},
        vendor::{self, Entity as VendorEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::po_status::{parse_status, PurchaseOrderStatus},
};

/// One requested line when placing a purchase order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    pub quantity_ordered: i32,
    /// Unit cost agreed with the vendor for this order
    pub cost_per_item: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VendorView {
    pub id: Uuid,
    pub name: String,
    pub contact_email: Option<String>,
}

impl From<vendor::Model> for VendorView {
    fn from(v: vendor::Model) -> Self {
        Self {
            id: v.id,
            name: v.name,
            contact_email: v.contact_email,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderItemView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_sku: String,
    pub quantity_ordered: i32,
    pub quantity_received: i32,
    pub cost_per_item: Decimal,
}

/// A purchase order with its vendor and line items joined in, the shape the
/// API hands back for both list and detail reads.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PurchaseOrderView {
    pub id: Uuid,
    pub vendor: VendorView,
    pub status: PurchaseOrderStatus,
    pub ordered_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemView>,
    /// Order valuation: sum of quantity_ordered * cost_per_item over all lines
    pub total_cost: Decimal,
}

/// Placement and read model for purchase orders. Receiving and status changes
/// live in their own services.
#[derive(Clone)]
pub struct PurchaseOrderService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl PurchaseOrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Creates a purchase order in `PENDING` with its line items, all in one
    /// transaction. Every referenced product must exist; quantities must be
    /// positive.
    #[instrument(skip(self, items), fields(vendor_id = %vendor_id, item_count = items.len()))]
    pub async fn create_purchase_order(
        &self,
        vendor_id: Uuid,
        items: Vec<NewOrderItem>,
    ) -> Result<PurchaseOrderView, ServiceError> {
        if items.is_empty() {
            return Err(ServiceError::ValidationError(
                "Purchase order must have at least one item".to_string(),
            ));
        }
        if let Some(bad) = items.iter().find(|i| i.quantity_ordered <= 0) {
            return Err(ServiceError::ValidationError(format!(
                "Ordered quantity must be positive for product {}, got {}",
                bad.product_id, bad.quantity_ordered
            )));
        }
        if let Some(bad) = items.iter().find(|i| i.cost_per_item < Decimal::ZERO) {
            return Err(ServiceError::ValidationError(format!(
                "Cost per item cannot be negative for product {}",
                bad.product_id
            )));
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(ServiceError::DatabaseError)?;

        VendorEntity::find_by_id(vendor_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Vendor {} not found", vendor_id)))?;

        for item in &items {
            ProductEntity::find_by_id(item.product_id)
                .one(&txn)
                .await
                .map_err(ServiceError::DatabaseError)?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", item.product_id))
                })?;
        }

        let now = Utc::now();
        let order = purchase_order::ActiveModel {
            id: Set(Uuid::new_v4()),
            vendor_id: Set(vendor_id),
            status: Set(PurchaseOrderStatus::Pending.to_string()),
            ordered_at: Set(None),
            received_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let order = order
            .insert(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        for item in &items {
            let row = purchase_order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                purchase_order_id: Set(order.id),
                product_id: Set(item.product_id),
                quantity_ordered: Set(item.quantity_ordered),
                quantity_received: Set(0),
                cost_per_item: Set(item.cost_per_item),
                created_at: Set(now),
            };
            row.insert(&txn)
                .await
                .map_err(ServiceError::DatabaseError)?;
        }

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(
            "Created purchase order {} with {} items for vendor {}",
            order.id,
            items.len(),
            vendor_id
        );

        self.event_sender
            .send_or_log(Event::PurchaseOrderCreated(order.id))
            .await;

        self.get_purchase_order(order.id).await
    }

    /// Loads one purchase order with vendor and items joined in.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_purchase_order(
        &self,
        order_id: Uuid,
    ) -> Result<PurchaseOrderView, ServiceError> {
        let order = OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Purchase order {} not found", order_id))
            })?;

        self.build_view(order).await
    }

    /// All purchase orders, newest first.
    #[instrument(skip(self))]
    pub async fn list_purchase_orders(&self) -> Result<Vec<PurchaseOrderView>, ServiceError> {
        let orders = OrderEntity::find()
            .order_by_desc(purchase_order::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let mut views = Vec::with_capacity(orders.len());
        for order in orders {
            views.push(self.build_view(order).await?);
        }
        Ok(views)
    }

    /// All vendors, by name.
    #[instrument(skip(self))]
    pub async fn list_vendors(&self) -> Result<Vec<VendorView>, ServiceError> {
        let vendors = VendorEntity::find()
            .order_by_asc(vendor::Column::Name)
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(vendors.into_iter().map(VendorView::from).collect())
    }

    async fn build_view(
        &self,
        order: purchase_order::Model,
    ) -> Result<PurchaseOrderView, ServiceError> {
        let vendor = order
            .find_related(VendorEntity)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Purchase order {} references missing vendor {}",
                    order.id, order.vendor_id
                ))
            })?;

        let rows = ItemEntity::find()
            .filter(purchase_order_item::Column::PurchaseOrderId.eq(order.id))
            .find_also_related(ProductEntity)
            .order_by_asc(purchase_order_item::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let mut items = Vec::with_capacity(rows.len());
        let mut total_cost = Decimal::ZERO;
        for (item, product) in rows {
            let product = product.ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Order item {} references missing product {}",
                    item.id, item.product_id
                ))
            })?;

            total_cost += item.cost_per_item * Decimal::from(item.quantity_ordered);
            items.push(OrderItemView {
                id: item.id,
                product_id: product.id,
                product_name: product.name,
                product_sku: product.sku,
                quantity_ordered: item.quantity_ordered,
                quantity_received: item.quantity_received,
                cost_per_item: item.cost_per_item,
            });
        }

        Ok(PurchaseOrderView {
            id: order.id,
            vendor: vendor.into(),
            status: parse_status(&order.status)?,
            ordered_at: order.ordered_at,
            received_at: order.received_at,
            created_at: order.created_at,
            items,
            total_cost,
        })
    }
}
