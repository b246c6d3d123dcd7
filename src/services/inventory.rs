use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait,
    DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::{
        inventory_lot::{self, Entity as LotEntity},
        product::{self, Entity as ProductEntity},
    },
    errors::ServiceError,
};

/// The inventory ledger: traceable lots per product plus the aggregate
/// `stock_quantity` counter. Mutations take an explicit connection handle so
/// the receiving coordinator can run them on its own transaction; one shipment
/// line always produces one lot, and every lot insert is paired with a
/// same-amount stock increment on the same handle.
#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DatabaseConnection>,
}

impl InventoryService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Creates one inventory lot with `quantity_remaining` equal to the
    /// received quantity. Lots are never merged, even when an existing lot for
    /// the product has the same expiration.
    pub async fn create_lot<C: ConnectionTrait>(
        &self,
        conn: &C,
        product_id: Uuid,
        quantity_received: i32,
        expiration_date: Option<NaiveDate>,
    ) -> Result<inventory_lot::Model, ServiceError> {
        if quantity_received <= 0 {
            return Err(ServiceError::ValidationError(format!(
                "Lot quantity must be positive, got {}",
                quantity_received
            )));
        }

        let now = Utc::now();
        let lot = inventory_lot::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            quantity_received: Set(quantity_received),
            quantity_remaining: Set(quantity_received),
            expiration_date: Set(expiration_date),
            received_at: Set(now),
            created_at: Set(now),
        };

        lot.insert(conn).await.map_err(ServiceError::DatabaseError)
    }

    /// Adds `amount` to the product's aggregate stock counter as an atomic
    /// column expression, never a read-modify-write on a loaded value.
    pub async fn increment_stock<C: ConnectionTrait>(
        &self,
        conn: &C,
        product_id: Uuid,
        amount: i32,
    ) -> Result<(), ServiceError> {
        let result = ProductEntity::update_many()
            .col_expr(
                product::Column::StockQuantity,
                Expr::col(product::Column::StockQuantity).add(amount),
            )
            .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(product::Column::Id.eq(product_id))
            .exec(conn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Product {} not found",
                product_id
            )));
        }

        Ok(())
    }

    /// Lots for a product, oldest receipt first (the order downstream
    /// consumption would drain them absent an expiration preference).
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn lots_for_product(
        &self,
        product_id: Uuid,
    ) -> Result<Vec<inventory_lot::Model>, ServiceError> {
        let product = ProductEntity::find_by_id(product_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if product.is_none() {
            return Err(ServiceError::NotFound(format!(
                "Product {} not found",
                product_id
            )));
        }

        LotEntity::find()
            .filter(inventory_lot::Column::ProductId.eq(product_id))
            .order_by_asc(inventory_lot::Column::ReceivedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Read-side projection: products whose stock is at or below their
    /// configured reorder threshold. Products without a threshold never appear.
    #[instrument(skip(self))]
    pub async fn low_stock_products(&self) -> Result<Vec<product::Model>, ServiceError> {
        let products = ProductEntity::find()
            .filter(product::Column::ReorderThreshold.is_not_null())
            .filter(
                Expr::col(product::Column::StockQuantity)
                    .lte(Expr::col(product::Column::ReorderThreshold)),
            )
            .order_by_asc(product::Column::Name)
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        info!("Found {} products at or below threshold", products.len());
        Ok(products)
    }
}
