//! In-memory fakes of the ports and small builders shared by the unit tests.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use crate::domain::{
    AdvancedReminderSuggestion, AnalysisStrategy, MedicationEntry, NotificationContent,
    PersistedReminder, PrescriptionLine, Recurrence, ReminderDraft, SourceRecord,
};
use crate::drafts::draft_id;
use crate::ports::{
    AnalysisProvider, NotificationScheduler, PersistenceStore, PortError, PortResult,
};
use crate::trigger::TriggerSpec;

pub fn line(drug: &str, frequency: &str) -> PrescriptionLine {
    PrescriptionLine {
        drug_name: drug.to_string(),
        dosage_text: "1 tablet".to_string(),
        frequency_text: frequency.to_string(),
        usage_instructions: "after meals".to_string(),
        note: None,
    }
}

pub fn record(id: &str, prescriptions: Vec<PrescriptionLine>) -> SourceRecord {
    SourceRecord {
        id: id.to_string(),
        hospital: "General Hospital".to_string(),
        clinician_name: "Dr. Kim".to_string(),
        prescriptions,
        ..SourceRecord::default()
    }
}

pub fn suggestion(medication: &str, time: &str) -> AdvancedReminderSuggestion {
    AdvancedReminderSuggestion {
        medication_name: medication.to_string(),
        dosage: "1 tablet".to_string(),
        frequency: "once daily".to_string(),
        instructions: "with water".to_string(),
        time: time.to_string(),
        ..AdvancedReminderSuggestion::default()
    }
}

pub fn draft(record_id: &str, medication: &str, time: &str) -> ReminderDraft {
    let time = time.parse().expect("test time");
    ReminderDraft {
        id: draft_id(record_id, medication, time),
        source_record_id: record_id.to_string(),
        medication_name: medication.to_string(),
        dosage: "1 tablet".to_string(),
        frequency_text: "twice daily".to_string(),
        instructions: "after meals".to_string(),
        notes: None,
        time_of_day: time,
        recurrence: Recurrence::Daily,
        analysis_strategy: AnalysisStrategy::Basic,
        ai_notes: None,
        ai_recommendations: None,
        revision: 0,
    }
}

//=========================================================================================
// Analysis Provider
//=========================================================================================

#[derive(Default)]
pub struct FakeProvider {
    results: HashMap<String, PortResult<Vec<AdvancedReminderSuggestion>>>,
    calls: AtomicUsize,
}

impl FakeProvider {
    pub fn failing(mut self, record_id: &str) -> Self {
        self.results.insert(
            record_id.to_string(),
            Err(PortError::Unexpected("provider unavailable".to_string())),
        );
        self
    }

    pub fn succeeding(mut self, record_id: &str, reminders: Vec<AdvancedReminderSuggestion>) -> Self {
        self.results.insert(record_id.to_string(), Ok(reminders));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisProvider for FakeProvider {
    async fn analyze(&self, record: &SourceRecord) -> PortResult<Vec<AdvancedReminderSuggestion>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.results
            .get(&record.id)
            .cloned()
            .unwrap_or_else(|| Err(PortError::NotFound(record.id.clone())))
    }
}

//=========================================================================================
// Notification Scheduler
//=========================================================================================

struct Armed {
    handle: String,
    trigger: TriggerSpec,
    content: NotificationContent,
    cancelled: bool,
}

#[derive(Default)]
pub struct RecordingScheduler {
    armed: Mutex<Vec<Armed>>,
    failing_title: Option<String>,
}

impl RecordingScheduler {
    pub fn failing_title(mut self, title: &str) -> Self {
        self.failing_title = Some(title.to_string());
        self
    }

    /// Notifications scheduled and not cancelled, in scheduling order.
    pub fn active(&self) -> Vec<(String, TriggerSpec, NotificationContent)> {
        self.armed
            .lock()
            .unwrap()
            .iter()
            .filter(|a| !a.cancelled)
            .map(|a| (a.handle.clone(), a.trigger, a.content.clone()))
            .collect()
    }
}

#[async_trait]
impl NotificationScheduler for RecordingScheduler {
    async fn schedule(
        &self,
        trigger: &TriggerSpec,
        content: &NotificationContent,
    ) -> PortResult<String> {
        if self.failing_title.as_deref() == Some(content.title.as_str()) {
            return Err(PortError::Unexpected("scheduler rejected trigger".to_string()));
        }
        let mut armed = self.armed.lock().unwrap();
        let handle = format!("n{}", armed.len() + 1);
        armed.push(Armed {
            handle: handle.clone(),
            trigger: *trigger,
            content: content.clone(),
            cancelled: false,
        });
        Ok(handle)
    }

    async fn cancel(&self, handle: &str) -> PortResult<()> {
        let mut armed = self.armed.lock().unwrap();
        let entry = armed
            .iter_mut()
            .find(|a| a.handle == handle)
            .ok_or_else(|| PortError::NotFound(handle.to_string()))?;
        entry.cancelled = true;
        Ok(())
    }
}

//=========================================================================================
// Persistence Store
//=========================================================================================

#[derive(Default)]
pub struct MemoryStore {
    reminders: Mutex<Vec<PersistedReminder>>,
    failing_records: HashSet<String>,
    reject_attachments: AtomicBool,
    reject_toggles: AtomicBool,
}

impl MemoryStore {
    pub fn failing_record(mut self, record_id: &str) -> Self {
        self.failing_records.insert(record_id.to_string());
        self
    }

    /// Makes every later `attach_notifications` call fail.
    pub fn reject_attachments(&self) {
        self.reject_attachments.store(true, Ordering::SeqCst);
    }

    /// Makes every later `set_enabled` call fail.
    pub fn reject_toggles(&self) {
        self.reject_toggles.store(true, Ordering::SeqCst);
    }

    pub fn all(&self) -> Vec<PersistedReminder> {
        self.reminders.lock().unwrap().clone()
    }

    fn update<F: FnOnce(&mut PersistedReminder)>(&self, id: Uuid, f: F) -> PortResult<()> {
        let mut reminders = self.reminders.lock().unwrap();
        let reminder = reminders
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| PortError::NotFound(id.to_string()))?;
        f(reminder);
        Ok(())
    }
}

#[async_trait]
impl PersistenceStore for MemoryStore {
    async fn save_group(
        &self,
        source_record_id: &str,
        anchor_date: NaiveDate,
        entries: &[MedicationEntry],
    ) -> PortResult<Vec<Uuid>> {
        if self.failing_records.contains(source_record_id) {
            return Err(PortError::Unexpected("database unavailable".to_string()));
        }
        let mut reminders = self.reminders.lock().unwrap();
        let ids = entries
            .iter()
            .map(|entry| {
                let id = Uuid::new_v4();
                reminders.push(PersistedReminder {
                    id,
                    source_record_id: source_record_id.to_string(),
                    medication_name: entry.medication_name.clone(),
                    dosage: entry.dosage.clone(),
                    frequency_text: entry.frequency_text.clone(),
                    instructions: entry.instructions.clone(),
                    notes: entry.notes.clone(),
                    times: entry.times.clone(),
                    recurrence: entry.recurrence,
                    analysis_strategy: entry.analysis_strategy,
                    ai_notes: entry.ai_notes.clone(),
                    ai_recommendations: entry.ai_recommendations.clone(),
                    enabled: true,
                    last_fired_at: None,
                    notification_handles: Vec::new(),
                    anchor_date,
                    created_at: Utc::now(),
                });
                id
            })
            .collect();
        Ok(ids)
    }

    async fn list_active(&self) -> PortResult<Vec<PersistedReminder>> {
        Ok(self.all())
    }

    async fn get(&self, id: Uuid) -> PortResult<PersistedReminder> {
        self.all()
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| PortError::NotFound(id.to_string()))
    }

    async fn delete(&self, id: Uuid) -> PortResult<()> {
        let mut reminders = self.reminders.lock().unwrap();
        let before = reminders.len();
        reminders.retain(|r| r.id != id);
        if reminders.len() == before {
            return Err(PortError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn set_enabled(&self, id: Uuid, enabled: bool) -> PortResult<()> {
        if self.reject_toggles.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("database unavailable".to_string()));
        }
        self.update(id, |r| r.enabled = enabled)
    }

    async fn attach_notifications(&self, id: Uuid, handles: &[String]) -> PortResult<()> {
        if self.reject_attachments.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("database unavailable".to_string()));
        }
        self.update(id, |r| r.notification_handles = handles.to_vec())
    }
}
