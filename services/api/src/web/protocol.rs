//! services/api/src/web/protocol.rs
//!
//! Defines the JSON payloads exchanged between the presentation layer and the
//! API server for previewing, editing and committing medication reminders.

use chrono::{DateTime, NaiveDate, Utc};
use reminder_core::{AnalysisStrategy, CommitReport, PersistedReminder, ReminderDraft, SourceRecord};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::state::PreviewState;

//=========================================================================================
// Requests
//=========================================================================================

/// Starts a preview for the selected visit records.
#[derive(Deserialize, Debug, ToSchema)]
pub struct CreatePreviewRequest {
    /// `basic` or `advanced`.
    #[schema(value_type = String, example = "basic")]
    pub strategy: AnalysisStrategy,
    /// The selected visit records, in selection order.
    #[schema(value_type = Vec<Object>)]
    pub records: Vec<SourceRecord>,
}

/// Replaces the two editable fields of a draft.
#[derive(Deserialize, Debug, ToSchema)]
pub struct EditDraftRequest {
    /// 24-hour `HH:MM`.
    #[schema(example = "08:30")]
    pub time_of_day: String,
    /// `none`, `daily`, `weekly` or `monthly`.
    #[schema(example = "daily")]
    pub recurrence: String,
}

/// Enables or disables a committed reminder.
#[derive(Deserialize, Debug, ToSchema)]
pub struct ToggleReminderRequest {
    pub enabled: bool,
}

//=========================================================================================
// Responses
//=========================================================================================

/// A staged draft as shown in the preview.
#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct DraftView {
    pub id: String,
    pub source_record_id: String,
    pub medication_name: String,
    pub dosage: String,
    pub frequency_text: String,
    pub instructions: String,
    pub notes: Option<String>,
    pub time_of_day: String,
    pub recurrence: String,
    pub analysis_strategy: String,
    pub ai_notes: Option<String>,
    pub ai_recommendations: Option<String>,
}

impl From<&ReminderDraft> for DraftView {
    fn from(draft: &ReminderDraft) -> Self {
        Self {
            id: draft.id.clone(),
            source_record_id: draft.source_record_id.clone(),
            medication_name: draft.medication_name.clone(),
            dosage: draft.dosage.clone(),
            frequency_text: draft.frequency_text.clone(),
            instructions: draft.instructions.clone(),
            notes: draft.notes.clone(),
            time_of_day: draft.time_of_day.to_string(),
            recurrence: draft.recurrence.to_string(),
            analysis_strategy: draft.analysis_strategy.to_string(),
            ai_notes: draft.ai_notes.clone(),
            ai_recommendations: draft.ai_recommendations.clone(),
        }
    }
}

/// The current state of a preview.
#[derive(Serialize, Debug, ToSchema)]
pub struct PreviewResponse {
    pub preview_id: Uuid,
    pub phase: String,
    /// Set when advanced analysis fell back to basic for every record.
    pub advisory: Option<String>,
    pub drafts: Vec<DraftView>,
    pub created_at: DateTime<Utc>,
}

impl PreviewResponse {
    pub fn from_state(preview_id: Uuid, preview: &PreviewState) -> Self {
        let workflow = &preview.workflow;
        let drafts = workflow
            .session()
            .map(|session| session.snapshot().iter().map(DraftView::from).collect())
            .unwrap_or_default();
        Self {
            preview_id,
            phase: workflow.phase().to_string(),
            advisory: workflow.advisory().map(|a| a.to_string()),
            drafts,
            created_at: preview.created_at,
        }
    }
}

/// A record group that failed to commit.
#[derive(Serialize, Debug, ToSchema)]
pub struct FailedGroupView {
    pub source_record_id: String,
    pub error: String,
}

/// The aggregate result of a commit.
#[derive(Serialize, Debug, ToSchema)]
pub struct CommitResponse {
    pub persisted: usize,
    pub scheduled: usize,
    pub failed_groups: Vec<FailedGroupView>,
    pub skipped_groups: Vec<String>,
}

impl From<CommitReport> for CommitResponse {
    fn from(report: CommitReport) -> Self {
        Self {
            persisted: report.persisted,
            scheduled: report.scheduled,
            failed_groups: report
                .failed_groups
                .into_iter()
                .map(|g| FailedGroupView {
                    source_record_id: g.source_record_id,
                    error: g.error,
                })
                .collect(),
            skipped_groups: report.skipped_groups,
        }
    }
}

/// A committed reminder.
#[derive(Serialize, Debug, ToSchema)]
pub struct ReminderView {
    pub id: Uuid,
    pub source_record_id: String,
    pub medication_name: String,
    pub dosage: String,
    pub frequency_text: String,
    pub instructions: String,
    pub notes: Option<String>,
    pub times: Vec<String>,
    pub recurrence: String,
    pub analysis_strategy: String,
    pub ai_notes: Option<String>,
    pub ai_recommendations: Option<String>,
    pub enabled: bool,
    pub last_fired_at: Option<DateTime<Utc>>,
    /// The date weekly and monthly triggers take their weekday and day from.
    pub anchor_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl From<PersistedReminder> for ReminderView {
    fn from(reminder: PersistedReminder) -> Self {
        Self {
            id: reminder.id,
            source_record_id: reminder.source_record_id,
            medication_name: reminder.medication_name,
            dosage: reminder.dosage,
            frequency_text: reminder.frequency_text,
            instructions: reminder.instructions,
            notes: reminder.notes,
            times: reminder.times.iter().map(|t| t.to_string()).collect(),
            recurrence: reminder.recurrence.to_string(),
            analysis_strategy: reminder.analysis_strategy.to_string(),
            ai_notes: reminder.ai_notes,
            ai_recommendations: reminder.ai_recommendations,
            enabled: reminder.enabled,
            last_fired_at: reminder.last_fired_at,
            anchor_date: reminder.anchor_date,
            created_at: reminder.created_at,
        }
    }
}
