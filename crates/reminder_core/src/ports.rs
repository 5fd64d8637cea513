//! crates/reminder_core/src/ports.rs
//!
//! Defines the service contracts (traits) the reminder pipeline depends on.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the AI provider, the database, and the notification backend.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::{
    AdvancedReminderSuggestion, MedicationEntry, NotificationContent, PersistedReminder,
    SourceRecord,
};
use crate::trigger::TriggerSpec;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Proposes reminders for a whole visit record (diagnosis, notes, prescriptions).
    async fn analyze(&self, record: &SourceRecord) -> PortResult<Vec<AdvancedReminderSuggestion>>;
}

#[async_trait]
pub trait NotificationScheduler: Send + Sync {
    /// Arms a trigger and returns a handle that can later cancel it.
    async fn schedule(
        &self,
        trigger: &TriggerSpec,
        content: &NotificationContent,
    ) -> PortResult<String>;

    async fn cancel(&self, handle: &str) -> PortResult<()>;
}

#[async_trait]
pub trait PersistenceStore: Send + Sync {
    /// Persists every entry of one source record, returning the new ids in entry order.
    ///
    /// `anchor_date` is stored with each reminder so its triggers can be re-armed later.
    async fn save_group(
        &self,
        source_record_id: &str,
        anchor_date: NaiveDate,
        entries: &[MedicationEntry],
    ) -> PortResult<Vec<Uuid>>;

    async fn list_active(&self) -> PortResult<Vec<PersistedReminder>>;

    async fn get(&self, id: Uuid) -> PortResult<PersistedReminder>;

    async fn delete(&self, id: Uuid) -> PortResult<()>;

    async fn set_enabled(&self, id: Uuid, enabled: bool) -> PortResult<()>;

    /// Replaces the scheduler handles recorded against a reminder.
    async fn attach_notifications(&self, id: Uuid, handles: &[String]) -> PortResult<()>;
}
