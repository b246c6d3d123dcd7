use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, DatabaseConnection, EntityTrait, QuerySelect,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::purchase_order::{
        self, ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel,
    },
    entities::purchase_order_item,
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Lifecycle status of a purchase order. Stored as its string form
/// (`SCREAMING_SNAKE_CASE`) in the `purchase_orders.status` column.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter,
    ToSchema,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseOrderStatus {
    Pending,
    Ordered,
    PartiallyReceived,
    Received,
    Cancelled,
}

impl PurchaseOrderStatus {
    /// States in which no further receiving is accepted. `Cancelled` can
    /// still be re-opened manually; `Received` is final.
    pub fn is_terminal_for_receiving(self) -> bool {
        matches!(self, Self::Received | Self::Cancelled)
    }

    /// The manual transition table. Receiving-driven transitions into
    /// `PartiallyReceived`/`Received` are computed, never requested here.
    pub fn can_transition(self, to: Self) -> bool {
        match (self, to) {
            (Self::Pending, Self::Ordered) => true,
            // Cancellation is allowed from any non-final state.
            (from, Self::Cancelled) => !from.is_terminal_for_receiving(),
            // Re-open a cancelled order.
            (Self::Cancelled, Self::Pending) => true,
            _ => false,
        }
    }
}

/// Parses the status column, treating an unrecognized value as data corruption
/// rather than caller error.
pub fn parse_status(raw: &str) -> Result<PurchaseOrderStatus, ServiceError> {
    PurchaseOrderStatus::from_str(raw).map_err(|_| {
        error!("Unrecognized purchase order status in database: {}", raw);
        ServiceError::InternalError(format!("Unrecognized purchase order status: {}", raw))
    })
}

/// Recomputes the receipt-driven status from the order's full item set:
/// `Received` iff every line has received at least what was ordered.
pub fn status_after_receipt(items: &[purchase_order_item::Model]) -> PurchaseOrderStatus {
    let fully_received = items
        .iter()
        .all(|item| item.quantity_received >= item.quantity_ordered);

    if fully_received {
        PurchaseOrderStatus::Received
    } else {
        PurchaseOrderStatus::PartiallyReceived
    }
}

/// Applies validated manual status transitions (ordering, cancellation,
/// re-open). The receiving coordinator owns the computed transitions.
#[derive(Clone)]
pub struct PurchaseOrderStatusService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl PurchaseOrderStatusService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Updates the status of a purchase order, enforcing the transition table.
    #[instrument(skip(self), fields(order_id = %order_id, target = %target))]
    pub async fn set_status(
        &self,
        order_id: Uuid,
        target: PurchaseOrderStatus,
    ) -> Result<OrderModel, ServiceError> {
        let db = &*self.db;
        let txn = db.begin().await.map_err(ServiceError::DatabaseError)?;

        let order = OrderEntity::find_by_id(order_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Purchase order {} not found", order_id))
            })?;

        let current = parse_status(&order.status)?;

        if !current.can_transition(target) {
            return Err(ServiceError::ValidationError(format!(
                "Cannot transition purchase order from {} to {}",
                current, target
            )));
        }

        let mut active: OrderActiveModel = order.into();
        active.status = Set(target.to_string());
        if target == PurchaseOrderStatus::Ordered {
            active.ordered_at = Set(Some(Utc::now()));
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&txn).await.map_err(|e| {
            error!("Failed to update purchase order {} status: {}", order_id, e);
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(
            "Purchase order {} status updated from '{}' to '{}'",
            order_id, current, target
        );

        self.event_sender
            .send_or_log(Event::PurchaseOrderStatusChanged {
                purchase_order_id: order_id,
                old_status: current.to_string(),
                new_status: target.to_string(),
            })
            .await;

        Ok(updated)
    }

    /// Gets the current status of a purchase order
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_status(&self, order_id: Uuid) -> Result<PurchaseOrderStatus, ServiceError> {
        let order = purchase_order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Purchase order {} not found", order_id))
            })?;

        parse_status(&order.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    use PurchaseOrderStatus::*;

    fn item(ordered: i32, received: i32) -> purchase_order_item::Model {
        purchase_order_item::Model {
            id: Uuid::new_v4(),
            purchase_order_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            quantity_ordered: ordered,
            quantity_received: received,
            cost_per_item: Decimal::ZERO,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn pending_can_only_move_to_ordered_or_cancelled() {
        assert!(Pending.can_transition(Ordered));
        assert!(Pending.can_transition(Cancelled));
        assert!(!Pending.can_transition(Received));
        assert!(!Pending.can_transition(PartiallyReceived));
        assert!(!Pending.can_transition(Pending));
    }

    #[test]
    fn cancellation_allowed_from_any_non_final_state() {
        assert!(Ordered.can_transition(Cancelled));
        assert!(PartiallyReceived.can_transition(Cancelled));
        assert!(!Received.can_transition(Cancelled));
        assert!(!Cancelled.can_transition(Cancelled));
    }

    #[test]
    fn cancelled_can_only_reopen_to_pending() {
        assert!(Cancelled.can_transition(Pending));
        assert!(!Cancelled.can_transition(Ordered));
        assert!(!Cancelled.can_transition(Received));
    }

    #[test]
    fn received_is_final() {
        for target in [Pending, Ordered, PartiallyReceived, Received, Cancelled] {
            assert!(!Received.can_transition(target));
        }
    }

    #[test]
    fn recompute_is_received_only_when_every_line_is_covered() {
        assert_eq!(status_after_receipt(&[item(10, 10)]), Received);
        assert_eq!(status_after_receipt(&[item(10, 12)]), Received);
        assert_eq!(status_after_receipt(&[item(10, 6)]), PartiallyReceived);
        assert_eq!(
            status_after_receipt(&[item(5, 5), item(3, 0)]),
            PartiallyReceived
        );
    }

    #[test]
    fn status_round_trips_through_its_string_form() {
        for status in [Pending, Ordered, PartiallyReceived, Received, Cancelled] {
            assert_eq!(parse_status(&status.to_string()).unwrap(), status);
        }
        assert_eq!(Ordered.to_string(), "ORDERED");
        assert_eq!(PartiallyReceived.to_string(), "PARTIALLY_RECEIVED");
        assert!(parse_status("SHIPPED").is_err());
    }
}
