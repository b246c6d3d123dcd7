use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection};
use tracing::error;
use uuid::Uuid;

use crate::entities::audit_log;

/// Best-effort audit trail writer. Entries are written on the service's own
/// connection, never on a caller's transaction: a failed audit write is logged
/// and swallowed so it can never unwind the operation being audited.
#[derive(Clone)]
pub struct AuditService {
    db: Arc<DatabaseConnection>,
}

impl AuditService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Records one audit entry. Fire-and-forget by contract.
    pub async fn record(&self, action: &str, details: &str, entity_id: &str, entity_type: &str) {
        let entry = audit_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            action: Set(action.to_string()),
            details: Set(details.to_string()),
            entity_id: Set(entity_id.to_string()),
            entity_type: Set(entity_type.to_string()),
            created_at: Set(Utc::now()),
        };

        if let Err(e) = entry.insert(&*self.db).await {
            error!(
                action,
                entity_id, entity_type, "Failed to write audit log entry: {}", e
            );
        }
    }
}
