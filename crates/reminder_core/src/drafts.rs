//! crates/reminder_core/src/drafts.rs
//!
//! Turns analysis output into the ordered list of reminder drafts shown in the preview.

use std::collections::HashSet;
use uuid::Uuid;

use crate::analysis::{RecordAnalysis, Suggestion};
use crate::domain::{AnalysisStrategy, Recurrence, ReminderDraft, TimeOfDay};

/// Derives the session-scoped id of a draft.
///
/// The same record, medication and time always give the same id, so
/// regenerating a preview yields ids that can be compared and de-duplicated.
pub fn draft_id(source_record_id: &str, medication_name: &str, time: TimeOfDay) -> String {
    let key = format!("{source_record_id}\u{1f}{medication_name}\u{1f}{time}");
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()).to_string()
}

fn to_draft(source_record_id: &str, suggestion: &Suggestion) -> ReminderDraft {
    match suggestion {
        Suggestion::Prescribed { line, time } => ReminderDraft {
            id: draft_id(source_record_id, &line.drug_name, *time),
            source_record_id: source_record_id.to_string(),
            medication_name: line.drug_name.clone(),
            dosage: line.dosage_text.clone(),
            frequency_text: line.frequency_text.clone(),
            instructions: line.usage_instructions.clone(),
            notes: line.note.clone(),
            time_of_day: *time,
            recurrence: Recurrence::Daily,
            analysis_strategy: AnalysisStrategy::Basic,
            ai_notes: None,
            ai_recommendations: None,
            revision: 0,
        },
        Suggestion::Advanced { suggestion, time } => ReminderDraft {
            id: draft_id(source_record_id, &suggestion.medication_name, *time),
            source_record_id: source_record_id.to_string(),
            medication_name: suggestion.medication_name.clone(),
            dosage: suggestion.dosage.clone(),
            frequency_text: suggestion.frequency.clone(),
            instructions: suggestion.instructions.clone(),
            notes: None,
            time_of_day: *time,
            recurrence: suggestion.recurrence.unwrap_or_default(),
            analysis_strategy: AnalysisStrategy::Advanced,
            ai_notes: suggestion.notes.clone(),
            ai_recommendations: suggestion.recommendations.clone(),
            revision: 0,
        },
    }
}

/// Builds drafts in record order, then suggestion order.
///
/// When two suggestions map to the same id the first one is kept.
pub fn build_drafts(analyses: &[RecordAnalysis]) -> Vec<ReminderDraft> {
    let mut seen = HashSet::new();
    analyses
        .iter()
        .flat_map(|analysis| {
            analysis
                .suggestions
                .iter()
                .map(move |s| to_draft(&analysis.source_record_id, s))
        })
        .filter(|draft| seen.insert(draft.id.clone()))
        .collect()
}
