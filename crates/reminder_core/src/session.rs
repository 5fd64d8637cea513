//! crates/reminder_core/src/session.rs
//!
//! The in-memory staging area where generated drafts are reviewed, edited and
//! deleted before commit. Single writer, no locking.

use crate::domain::{Recurrence, ReminderDraft, TimeOfDay};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Draft not found: {0}")]
    NotFound(String),
}

/// An ordered collection of drafts addressed by draft id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewSession {
    drafts: Vec<ReminderDraft>,
    edits: u64,
}

impl PreviewSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session populated in one batch.
    pub fn from_drafts(drafts: Vec<ReminderDraft>) -> Self {
        Self { drafts, edits: 0 }
    }

    /// Replaces the time of day and recurrence of one draft.
    ///
    /// Nothing else on the draft changes, including its id.
    pub fn edit(
        &mut self,
        id: &str,
        time_of_day: TimeOfDay,
        recurrence: Recurrence,
    ) -> Result<&ReminderDraft, SessionError> {
        let draft = self
            .drafts
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;

        self.edits += 1;
        draft.time_of_day = time_of_day;
        draft.recurrence = recurrence;
        draft.revision = self.edits;
        Ok(draft)
    }

    /// Removes a draft. Returns whether anything was removed; absent ids are a no-op.
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.drafts.len();
        self.drafts.retain(|d| d.id != id);
        self.drafts.len() != before
    }

    pub fn get(&self, id: &str) -> Option<&ReminderDraft> {
        self.drafts.iter().find(|d| d.id == id)
    }

    /// The current drafts in display order.
    pub fn snapshot(&self) -> &[ReminderDraft] {
        &self.drafts
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }

    pub fn into_drafts(self) -> Vec<ReminderDraft> {
        self.drafts
    }
}
