pub mod analysis;
pub mod commit;
pub mod domain;
pub mod drafts;
pub mod frequency;
pub mod grouping;
pub mod ports;
pub mod reminders;
pub mod session;
pub mod trigger;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use analysis::{Advisory, AnalysisOrchestrator, Analyzer, GenerationOutcome};
pub use commit::{CommitAdapter, CommitReport, FailedGroup};
pub use domain::{
    AdvancedReminderSuggestion, AnalysisStrategy, MedicationEntry, NotificationContent,
    PersistedReminder, PrescriptionLine, Recurrence, ReminderDraft, SourceRecord, TimeOfDay,
    UnknownVariant,
};
pub use ports::{AnalysisProvider, NotificationScheduler, PersistenceStore, PortError, PortResult};
pub use reminders::ActiveReminders;
pub use session::{PreviewSession, SessionError};
pub use trigger::TriggerSpec;
pub use workflow::{Phase, Workflow, WorkflowError};
