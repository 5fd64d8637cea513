//! crates/reminder_core/src/grouping.rs
//!
//! Group-by helpers and the merge rule applied to drafts at commit time.
//!
//! Drafts are partitioned by source record, then by medication name. Each
//! medication group becomes one `MedicationEntry` whose times are the union of
//! the group's times and whose recurrence comes from the most recently edited
//! draft (the first draft when none was edited).

use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;

use crate::domain::{MedicationEntry, ReminderDraft};

/// Groups items by key, keeping groups in first-seen order and items in input order.
pub fn group_by_key<T, K, F>(items: impl IntoIterator<Item = T>, mut key: F) -> Vec<(K, Vec<T>)>
where
    K: Eq + Hash + Clone,
    F: FnMut(&T) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<T>)> = Vec::new();
    for item in items {
        let k = key(&item);
        match index.get(&k) {
            Some(&i) => groups[i].1.push(item),
            None => {
                index.insert(k.clone(), groups.len());
                groups.push((k, vec![item]));
            }
        }
    }
    groups
}

/// All medication entries belonging to one source record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MedicationGroup {
    pub source_record_id: String,
    pub entries: Vec<MedicationEntry>,
}

/// Merges drafts that share a source record and medication name.
///
/// Returns `None` for an empty slice.
pub fn merge_medication(drafts: &[&ReminderDraft]) -> Option<MedicationEntry> {
    let representative = *drafts.first()?;

    let times: BTreeSet<_> = drafts.iter().map(|d| d.time_of_day).collect();

    // Strictly greater keeps the earliest draft on ties.
    let latest = drafts.iter().copied().fold(representative, |best, d| {
        if d.revision > best.revision {
            d
        } else {
            best
        }
    });

    Some(MedicationEntry {
        medication_name: representative.medication_name.clone(),
        dosage: representative.dosage.clone(),
        frequency_text: representative.frequency_text.clone(),
        instructions: representative.instructions.clone(),
        notes: representative.notes.clone(),
        times: times.into_iter().collect(),
        recurrence: latest.recurrence,
        analysis_strategy: representative.analysis_strategy,
        ai_notes: representative.ai_notes.clone(),
        ai_recommendations: representative.ai_recommendations.clone(),
    })
}

/// Partitions drafts by source record, then merges each medication within it.
pub fn merge_groups(drafts: &[ReminderDraft]) -> Vec<MedicationGroup> {
    group_by_key(drafts.iter(), |d| d.source_record_id.clone())
        .into_iter()
        .map(|(source_record_id, record_drafts)| {
            let entries = group_by_key(record_drafts, |d| d.medication_name.clone())
                .into_iter()
                .filter_map(|(_, medication_drafts)| merge_medication(&medication_drafts))
                .collect();
            MedicationGroup {
                source_record_id,
                entries,
            }
        })
        .collect()
}
