//! services/api/src/adapters/notifications.rs
//!
//! Implements the `NotificationScheduler` port as a Postgres-backed queue.
//! Each armed trigger becomes a row in `scheduled_notifications`; a separate
//! delivery worker reads that table and fires the notifications.

use async_trait::async_trait;
use reminder_core::domain::NotificationContent;
use reminder_core::ports::{NotificationScheduler, PortError, PortResult};
use reminder_core::trigger::TriggerSpec;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

/// A notification queue that implements the `NotificationScheduler` port.
#[derive(Clone)]
pub struct PgNotificationQueue {
    pool: PgPool,
}

impl PgNotificationQueue {
    /// Creates a new `PgNotificationQueue`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// The short trigger name stored next to the serialized trigger.
fn trigger_kind(trigger: &TriggerSpec) -> &'static str {
    match trigger {
        TriggerSpec::Once { .. } => "once",
        TriggerSpec::Daily { .. } => "daily",
        TriggerSpec::Weekly { .. } => "weekly",
        TriggerSpec::Monthly { .. } => "monthly",
    }
}

#[async_trait]
impl NotificationScheduler for PgNotificationQueue {
    async fn schedule(
        &self,
        trigger: &TriggerSpec,
        content: &NotificationContent,
    ) -> PortResult<String> {
        let handle = Uuid::new_v4();
        let spec = serde_json::to_string(trigger).map_err(|e| PortError::Unexpected(e.to_string()))?;

        sqlx::query(
            "INSERT INTO scheduled_notifications (handle, trigger_kind, trigger_spec, title, body) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(handle)
        .bind(trigger_kind(trigger))
        .bind(&spec)
        .bind(&content.title)
        .bind(&content.body)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        debug!("Queued notification {} ({})", handle, trigger);
        Ok(handle.to_string())
    }

    async fn cancel(&self, handle: &str) -> PortResult<()> {
        let handle_id = Uuid::parse_str(handle)
            .map_err(|_| PortError::InvalidInput(format!("'{}' is not a notification handle", handle)))?;

        let result = sqlx::query("DELETE FROM scheduled_notifications WHERE handle = $1")
            .bind(handle_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Notification {} not found", handle)));
        }
        Ok(())
    }
}
