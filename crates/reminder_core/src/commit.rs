//! crates/reminder_core/src/commit.rs
//!
//! Submits the surviving drafts to the persistence store and the notification
//! scheduler, one source record at a time.
//!
//! Each record group either fully succeeds (every reminder persisted and every
//! time armed) or is reported as failed; a failed group never stops the groups
//! after it. Cancellation stops groups that have not been sent yet.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{NotificationContent, ReminderDraft};
use crate::grouping::{merge_groups, MedicationGroup};
use crate::ports::{NotificationScheduler, PersistenceStore, PortError, PortResult};
use crate::trigger::to_trigger;

/// A record group that could not be committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedGroup {
    pub source_record_id: String,
    pub error: String,
}

/// The aggregate outcome of a commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitReport {
    /// Reminders persisted with all of their notifications armed.
    pub persisted: usize,
    /// Notifications armed across all persisted reminders.
    pub scheduled: usize,
    pub failed_groups: Vec<FailedGroup>,
    /// Groups never sent because the commit was cancelled first.
    pub skipped_groups: Vec<String>,
}

impl CommitReport {
    pub fn is_complete(&self) -> bool {
        self.failed_groups.is_empty() && self.skipped_groups.is_empty()
    }
}

/// What one record group contributed to the report.
struct GroupOutcome {
    persisted: usize,
    scheduled: usize,
}

#[derive(Clone)]
pub struct CommitAdapter {
    store: Arc<dyn PersistenceStore>,
    scheduler: Arc<dyn NotificationScheduler>,
}

impl CommitAdapter {
    pub fn new(store: Arc<dyn PersistenceStore>, scheduler: Arc<dyn NotificationScheduler>) -> Self {
        Self { store, scheduler }
    }

    /// Commits drafts group by group.
    ///
    /// `now` anchors every trigger: its date fixes the weekday and day of month
    /// of repeating reminders and the firing date of one-shot ones.
    pub async fn commit(
        &self,
        drafts: &[ReminderDraft],
        now: NaiveDateTime,
        cancellation_token: &CancellationToken,
    ) -> CommitReport {
        let groups = merge_groups(drafts);
        let mut report = CommitReport::default();

        for group in groups {
            if cancellation_token.is_cancelled() {
                report.skipped_groups.push(group.source_record_id);
                continue;
            }

            match self.commit_group(&group, now).await {
                Ok(outcome) => {
                    report.persisted += outcome.persisted;
                    report.scheduled += outcome.scheduled;
                }
                Err(e) => {
                    error!(
                        "Failed to commit reminders for record {}: {}",
                        group.source_record_id, e
                    );
                    report.failed_groups.push(FailedGroup {
                        source_record_id: group.source_record_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Commit finished: {} reminder(s) persisted, {} failed group(s), {} skipped group(s)",
            report.persisted,
            report.failed_groups.len(),
            report.skipped_groups.len()
        );
        report
    }

    async fn commit_group(&self, group: &MedicationGroup, now: NaiveDateTime) -> PortResult<GroupOutcome> {
        let ids = self
            .store
            .save_group(&group.source_record_id, now.date(), &group.entries)
            .await?;

        if ids.len() != group.entries.len() {
            self.rollback(&ids, &[]).await;
            return Err(PortError::Unexpected(format!(
                "store returned {} id(s) for {} reminder(s)",
                ids.len(),
                group.entries.len()
            )));
        }

        let mut armed: Vec<String> = Vec::new();
        for (id, entry) in ids.iter().zip(&group.entries) {
            let content = NotificationContent::for_medication(
                &entry.medication_name,
                &entry.dosage,
                &entry.instructions,
            );

            let mut handles = Vec::with_capacity(entry.times.len());
            for time in &entry.times {
                let trigger = to_trigger(entry.recurrence, *time, now.date(), now);
                match self.scheduler.schedule(&trigger, &content).await {
                    Ok(handle) => handles.push(handle),
                    Err(e) => {
                        armed.extend(handles);
                        self.rollback(&ids, &armed).await;
                        return Err(e);
                    }
                }
            }

            let attached = self.store.attach_notifications(*id, &handles).await;
            armed.extend(handles);
            if let Err(e) = attached {
                self.rollback(&ids, &armed).await;
                return Err(e);
            }
        }

        Ok(GroupOutcome {
            persisted: ids.len(),
            scheduled: armed.len(),
        })
    }

    /// Best-effort undo of a partially committed group.
    async fn rollback(&self, ids: &[Uuid], handles: &[String]) {
        for handle in handles {
            if let Err(e) = self.scheduler.cancel(handle).await {
                warn!("Failed to cancel notification {} during rollback: {}", handle, e);
            }
        }
        for id in ids {
            if let Err(e) = self.store.delete(*id).await {
                warn!("Failed to delete reminder {} during rollback: {}", id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Recurrence, TimeOfDay};
    use crate::session::PreviewSession;
    use crate::testing::{draft, MemoryStore, RecordingScheduler};
    use crate::trigger::TriggerSpec;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 15)
            .unwrap()
            .and_hms_opt(7, 0, 0)
            .unwrap()
    }

    fn adapter(store: &Arc<MemoryStore>, scheduler: &Arc<RecordingScheduler>) -> CommitAdapter {
        CommitAdapter::new(store.clone(), scheduler.clone())
    }

    #[tokio::test]
    async fn sibling_drafts_merge_into_one_reminder() {
        let store = Arc::new(MemoryStore::default());
        let scheduler = Arc::new(RecordingScheduler::default());
        let drafts = vec![
            draft("r1", "Aspirin", "08:00"),
            draft("r1", "Aspirin", "20:00"),
        ];

        let report = adapter(&store, &scheduler)
            .commit(&drafts, now(), &CancellationToken::new())
            .await;

        assert!(report.is_complete());
        assert_eq!(report.persisted, 1);
        assert_eq!(report.scheduled, 2);
        let saved = store.all();
        assert_eq!(saved.len(), 1);
        let times: Vec<_> = saved[0].times.iter().map(|t| t.to_string()).collect();
        assert_eq!(times, ["08:00", "20:00"]);
        assert_eq!(saved[0].notification_handles.len(), 2);
    }

    #[tokio::test]
    async fn edited_time_replaces_original() {
        let store = Arc::new(MemoryStore::default());
        let scheduler = Arc::new(RecordingScheduler::default());
        let mut session = PreviewSession::from_drafts(vec![
            draft("r1", "Aspirin", "08:00"),
            draft("r1", "Aspirin", "20:00"),
        ]);
        let id = session.snapshot()[0].id.clone();
        let edited: TimeOfDay = "09:30".parse().unwrap();
        session.edit(&id, edited, Recurrence::Daily).unwrap();

        adapter(&store, &scheduler)
            .commit(session.snapshot(), now(), &CancellationToken::new())
            .await;

        let saved = store.all();
        assert!(saved[0].times.contains(&edited));
        assert!(!saved[0].times.contains(&"08:00".parse().unwrap()));
    }

    #[tokio::test]
    async fn deleted_draft_is_not_persisted() {
        let store = Arc::new(MemoryStore::default());
        let scheduler = Arc::new(RecordingScheduler::default());
        let mut session = PreviewSession::from_drafts(vec![
            draft("r1", "Aspirin", "08:00"),
            draft("r1", "Aspirin", "20:00"),
            draft("r1", "Zinc", "12:00"),
        ]);
        let zinc = session.snapshot()[2].id.clone();
        let evening = session.snapshot()[1].id.clone();
        session.delete(&zinc);
        session.delete(&evening);

        adapter(&store, &scheduler)
            .commit(session.snapshot(), now(), &CancellationToken::new())
            .await;

        let saved = store.all();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].medication_name, "Aspirin");
        assert_eq!(saved[0].times, vec!["08:00".parse::<TimeOfDay>().unwrap()]);
    }

    #[tokio::test]
    async fn failed_group_does_not_block_siblings() {
        let store = Arc::new(MemoryStore::default().failing_record("r2"));
        let scheduler = Arc::new(RecordingScheduler::default());
        let drafts = vec![
            draft("r1", "Aspirin", "08:00"),
            draft("r2", "Zinc", "08:00"),
            draft("r3", "Iron", "08:00"),
        ];

        let report = adapter(&store, &scheduler)
            .commit(&drafts, now(), &CancellationToken::new())
            .await;

        assert_eq!(report.persisted, 2);
        assert_eq!(report.failed_groups.len(), 1);
        assert_eq!(report.failed_groups[0].source_record_id, "r2");
        let mut records: Vec<_> = store.all().into_iter().map(|r| r.source_record_id).collect();
        records.sort();
        assert_eq!(records, ["r1", "r3"]);
    }

    #[tokio::test]
    async fn scheduling_failure_rolls_back_the_group() {
        let store = Arc::new(MemoryStore::default());
        let scheduler = Arc::new(RecordingScheduler::default().failing_title("Zinc"));
        let drafts = vec![
            draft("r1", "Aspirin", "08:00"),
            draft("r1", "Zinc", "08:00"),
            draft("r2", "Iron", "08:00"),
        ];

        let report = adapter(&store, &scheduler)
            .commit(&drafts, now(), &CancellationToken::new())
            .await;

        assert_eq!(report.failed_groups.len(), 1);
        assert_eq!(report.failed_groups[0].source_record_id, "r1");
        assert_eq!(report.persisted, 1);
        let saved = store.all();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].source_record_id, "r2");
        assert_eq!(scheduler.active().len(), 1);
    }

    #[tokio::test]
    async fn cancellation_skips_unsent_groups() {
        let store = Arc::new(MemoryStore::default());
        let scheduler = Arc::new(RecordingScheduler::default());
        let token = CancellationToken::new();
        token.cancel();

        let report = adapter(&store, &scheduler)
            .commit(&[draft("r1", "Aspirin", "08:00")], now(), &token)
            .await;

        assert_eq!(report.persisted, 0);
        assert_eq!(report.skipped_groups, vec!["r1".to_string()]);
        assert!(store.all().is_empty());
    }

    #[tokio::test]
    async fn triggers_follow_recurrence() {
        let store = Arc::new(MemoryStore::default());
        let scheduler = Arc::new(RecordingScheduler::default());
        let mut weekly = draft("r1", "Methotrexate", "09:00");
        weekly.recurrence = Recurrence::Weekly;

        adapter(&store, &scheduler)
            .commit(&[weekly], now(), &CancellationToken::new())
            .await;

        let armed = scheduler.active();
        assert_eq!(
            armed[0].1,
            TriggerSpec::Weekly {
                weekday: 1,
                hour: 9,
                minute: 0
            }
        );
        assert_eq!(armed[0].2.title, "Methotrexate");
    }
}
