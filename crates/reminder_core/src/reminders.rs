//! crates/reminder_core/src/reminders.rs
//!
//! User-initiated maintenance of committed reminders: listing, toggling and deleting.

use chrono::NaiveDateTime;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{NotificationContent, PersistedReminder};
use crate::ports::{NotificationScheduler, PersistenceStore, PortResult};
use crate::trigger::to_trigger;

#[derive(Clone)]
pub struct ActiveReminders {
    store: Arc<dyn PersistenceStore>,
    scheduler: Arc<dyn NotificationScheduler>,
}

impl ActiveReminders {
    pub fn new(store: Arc<dyn PersistenceStore>, scheduler: Arc<dyn NotificationScheduler>) -> Self {
        Self { store, scheduler }
    }

    pub async fn list(&self) -> PortResult<Vec<PersistedReminder>> {
        self.store.list_active().await
    }

    /// Enables or disables a reminder.
    ///
    /// Disabling cancels its notifications. Enabling re-arms one notification
    /// per stored time from the reminder's commit-time anchor date, so weekly
    /// and monthly reminders keep their original weekday and day of month.
    /// A failed enable cancels whatever it armed before returning the error.
    pub async fn set_enabled(
        &self,
        id: Uuid,
        enabled: bool,
        now: NaiveDateTime,
    ) -> PortResult<PersistedReminder> {
        let reminder = self.store.get(id).await?;
        if reminder.enabled == enabled {
            return Ok(reminder);
        }

        if enabled {
            self.enable(&reminder, now).await?;
        } else {
            self.store.set_enabled(id, false).await?;
            self.cancel_all(&reminder.notification_handles).await;
            if let Err(e) = self.store.attach_notifications(id, &[]).await {
                warn!("Reminder {} disabled but its handles were not cleared: {}", id, e);
            }
        }

        info!("Reminder {} {}", id, if enabled { "enabled" } else { "disabled" });
        self.store.get(id).await
    }

    async fn enable(&self, reminder: &PersistedReminder, now: NaiveDateTime) -> PortResult<()> {
        let content = NotificationContent::for_medication(
            &reminder.medication_name,
            &reminder.dosage,
            &reminder.instructions,
        );
        let mut handles = Vec::with_capacity(reminder.times.len());
        for time in &reminder.times {
            let trigger = to_trigger(reminder.recurrence, *time, reminder.anchor_date, now);
            match self.scheduler.schedule(&trigger, &content).await {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    self.cancel_all(&handles).await;
                    return Err(e);
                }
            }
        }

        if let Err(e) = self.store.attach_notifications(reminder.id, &handles).await {
            self.cancel_all(&handles).await;
            return Err(e);
        }
        if let Err(e) = self.store.set_enabled(reminder.id, true).await {
            self.cancel_all(&handles).await;
            if let Err(clear) = self.store.attach_notifications(reminder.id, &[]).await {
                warn!("Failed to clear handles of reminder {}: {}", reminder.id, clear);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Deletes a reminder after cancelling whatever it has armed.
    pub async fn remove(&self, id: Uuid) -> PortResult<()> {
        let reminder = self.store.get(id).await?;
        self.cancel_all(&reminder.notification_handles).await;
        self.store.delete(id).await?;
        info!("Reminder {} deleted", id);
        Ok(())
    }

    async fn cancel_all(&self, handles: &[String]) {
        for handle in handles {
            if let Err(e) = self.scheduler.cancel(handle).await {
                warn!("Failed to cancel notification {}: {}", handle, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::CommitAdapter;
    use crate::domain::Recurrence;
    use crate::ports::PortError;
    use crate::testing::{draft, MemoryStore, RecordingScheduler};
    use crate::trigger::TriggerSpec;
    use chrono::NaiveDate;
    use tokio_util::sync::CancellationToken;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 15)
            .unwrap()
            .and_hms_opt(7, 0, 0)
            .unwrap()
    }

    async fn committed() -> (Arc<MemoryStore>, Arc<RecordingScheduler>, Uuid) {
        let store = Arc::new(MemoryStore::default());
        let scheduler = Arc::new(RecordingScheduler::default());
        CommitAdapter::new(store.clone(), scheduler.clone())
            .commit(
                &[draft("r1", "Aspirin", "08:00"), draft("r1", "Aspirin", "20:00")],
                now(),
                &CancellationToken::new(),
            )
            .await;
        let id = store.all()[0].id;
        (store, scheduler, id)
    }

    #[tokio::test]
    async fn disabling_cancels_and_enabling_rearms() {
        let (store, scheduler, id) = committed().await;
        let reminders = ActiveReminders::new(store.clone(), scheduler.clone());

        let off = reminders.set_enabled(id, false, now()).await.unwrap();
        assert!(!off.enabled);
        assert!(off.notification_handles.is_empty());
        assert!(scheduler.active().is_empty());

        let on = reminders.set_enabled(id, true, now()).await.unwrap();
        assert!(on.enabled);
        assert_eq!(on.notification_handles.len(), 2);
        assert_eq!(scheduler.active().len(), 2);
    }

    #[tokio::test]
    async fn reenabling_keeps_the_commit_weekday() {
        let store = Arc::new(MemoryStore::default());
        let scheduler = Arc::new(RecordingScheduler::default());
        let mut weekly = draft("r1", "Methotrexate", "09:00");
        weekly.recurrence = Recurrence::Weekly;
        CommitAdapter::new(store.clone(), scheduler.clone())
            .commit(&[weekly], now(), &CancellationToken::new())
            .await;
        let id = store.all()[0].id;
        assert_eq!(store.all()[0].anchor_date, now().date());

        let reminders = ActiveReminders::new(store.clone(), scheduler.clone());
        reminders.set_enabled(id, false, now()).await.unwrap();
        let wednesday = NaiveDate::from_ymd_opt(2026, 3, 18)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        reminders.set_enabled(id, true, wednesday).await.unwrap();

        let armed = scheduler.active();
        assert_eq!(armed.len(), 1);
        assert_eq!(
            armed[0].1,
            TriggerSpec::Weekly {
                weekday: 1,
                hour: 9,
                minute: 0
            }
        );
    }

    #[tokio::test]
    async fn failed_attach_cancels_rearmed_notifications() {
        let (store, scheduler, id) = committed().await;
        let reminders = ActiveReminders::new(store.clone(), scheduler.clone());
        reminders.set_enabled(id, false, now()).await.unwrap();
        store.reject_attachments();

        let result = reminders.set_enabled(id, true, now()).await;

        assert!(matches!(result, Err(PortError::Unexpected(_))));
        assert!(scheduler.active().is_empty());
        let stored = &store.all()[0];
        assert!(!stored.enabled);
        assert!(stored.notification_handles.is_empty());
    }

    #[tokio::test]
    async fn failed_toggle_cancels_rearmed_notifications() {
        let (store, scheduler, id) = committed().await;
        let reminders = ActiveReminders::new(store.clone(), scheduler.clone());
        reminders.set_enabled(id, false, now()).await.unwrap();
        store.reject_toggles();

        assert!(reminders.set_enabled(id, true, now()).await.is_err());

        assert!(scheduler.active().is_empty());
        let stored = &store.all()[0];
        assert!(!stored.enabled);
        assert!(stored.notification_handles.is_empty());
    }

    #[tokio::test]
    async fn failed_disable_leaves_notifications_armed() {
        let (store, scheduler, id) = committed().await;
        let reminders = ActiveReminders::new(store.clone(), scheduler.clone());
        store.reject_toggles();

        assert!(reminders.set_enabled(id, false, now()).await.is_err());

        assert_eq!(scheduler.active().len(), 2);
        let stored = &store.all()[0];
        assert!(stored.enabled);
        assert_eq!(stored.notification_handles.len(), 2);
    }

    #[tokio::test]
    async fn toggling_to_current_state_is_a_no_op() {
        let (store, scheduler, id) = committed().await;
        let reminders = ActiveReminders::new(store, scheduler.clone());
        reminders.set_enabled(id, true, now()).await.unwrap();
        assert_eq!(scheduler.active().len(), 2);
    }

    #[tokio::test]
    async fn remove_cancels_and_deletes() {
        let (store, scheduler, id) = committed().await;
        let reminders = ActiveReminders::new(store.clone(), scheduler.clone());

        reminders.remove(id).await.unwrap();

        assert!(reminders.list().await.unwrap().is_empty());
        assert!(scheduler.active().is_empty());
        assert!(matches!(reminders.remove(id).await, Err(PortError::NotFound(_))));
    }
}
