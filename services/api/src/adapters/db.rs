//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `PersistenceStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reminder_core::domain::{
    AnalysisStrategy, MedicationEntry, PersistedReminder, Recurrence, TimeOfDay,
};
use reminder_core::ports::{PersistenceStore, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

const REMINDER_COLUMNS: &str = "id, source_record_id, medication_name, dosage, frequency_text, \
     instructions, notes, times, recurrence, analysis_strategy, ai_notes, ai_recommendations, \
     enabled, last_fired_at, notification_handles, anchor_date, created_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `PersistenceStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ReminderRecord {
    id: Uuid,
    source_record_id: String,
    medication_name: String,
    dosage: String,
    frequency_text: String,
    instructions: String,
    notes: Option<String>,
    times: Vec<String>,
    recurrence: String,
    analysis_strategy: String,
    ai_notes: Option<String>,
    ai_recommendations: Option<String>,
    enabled: bool,
    last_fired_at: Option<DateTime<Utc>>,
    notification_handles: Vec<String>,
    anchor_date: NaiveDate,
    created_at: DateTime<Utc>,
}

impl ReminderRecord {
    fn to_domain(self) -> PortResult<PersistedReminder> {
        let times = self
            .times
            .iter()
            .map(|t| t.parse::<TimeOfDay>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| PortError::Unexpected(format!("Reminder {}: {}", self.id, e)))?;
        let recurrence = self
            .recurrence
            .parse::<Recurrence>()
            .map_err(|e| PortError::Unexpected(format!("Reminder {}: {}", self.id, e)))?;
        let analysis_strategy = self
            .analysis_strategy
            .parse::<AnalysisStrategy>()
            .map_err(|e| PortError::Unexpected(format!("Reminder {}: {}", self.id, e)))?;

        Ok(PersistedReminder {
            id: self.id,
            source_record_id: self.source_record_id,
            medication_name: self.medication_name,
            dosage: self.dosage,
            frequency_text: self.frequency_text,
            instructions: self.instructions,
            notes: self.notes,
            times,
            recurrence,
            analysis_strategy,
            ai_notes: self.ai_notes,
            ai_recommendations: self.ai_recommendations,
            enabled: self.enabled,
            last_fired_at: self.last_fired_at,
            notification_handles: self.notification_handles,
            anchor_date: self.anchor_date,
            created_at: self.created_at,
        })
    }
}

//=========================================================================================
// `PersistenceStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl PersistenceStore for DbAdapter {
    async fn save_group(
        &self,
        source_record_id: &str,
        anchor_date: NaiveDate,
        entries: &[MedicationEntry],
    ) -> PortResult<Vec<Uuid>> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let mut ids = Vec::with_capacity(entries.len());

        for entry in entries {
            let id = Uuid::new_v4();
            let times: Vec<String> = entry.times.iter().map(|t| t.to_string()).collect();
            sqlx::query(
                "INSERT INTO medication_reminders (id, source_record_id, medication_name, dosage, \
                 frequency_text, instructions, notes, times, recurrence, analysis_strategy, \
                 ai_notes, ai_recommendations, anchor_date) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
            )
            .bind(id)
            .bind(source_record_id)
            .bind(&entry.medication_name)
            .bind(&entry.dosage)
            .bind(&entry.frequency_text)
            .bind(&entry.instructions)
            .bind(&entry.notes)
            .bind(&times)
            .bind(entry.recurrence.as_str())
            .bind(entry.analysis_strategy.as_str())
            .bind(&entry.ai_notes)
            .bind(&entry.ai_recommendations)
            .bind(anchor_date)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
            ids.push(id);
        }

        tx.commit().await.map_err(unexpected)?;
        info!(
            "Saved {} reminder(s) for record {}",
            ids.len(),
            source_record_id
        );
        Ok(ids)
    }

    async fn list_active(&self) -> PortResult<Vec<PersistedReminder>> {
        let records = sqlx::query_as::<_, ReminderRecord>(&format!(
            "SELECT {REMINDER_COLUMNS} FROM medication_reminders ORDER BY created_at ASC, medication_name ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn get(&self, id: Uuid) -> PortResult<PersistedReminder> {
        let record = sqlx::query_as::<_, ReminderRecord>(&format!(
            "SELECT {REMINDER_COLUMNS} FROM medication_reminders WHERE id = $1"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("Reminder {} not found", id)),
            _ => PortError::Unexpected(e.to_string()),
        })?;
        record.to_domain()
    }

    async fn delete(&self, id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM medication_reminders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Reminder {} not found", id)));
        }
        Ok(())
    }

    async fn set_enabled(&self, id: Uuid, enabled: bool) -> PortResult<()> {
        let result = sqlx::query("UPDATE medication_reminders SET enabled = $1 WHERE id = $2")
            .bind(enabled)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Reminder {} not found", id)));
        }
        Ok(())
    }

    async fn attach_notifications(&self, id: Uuid, handles: &[String]) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE medication_reminders SET notification_handles = $1 WHERE id = $2",
        )
        .bind(handles)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Reminder {} not found", id)));
        }
        Ok(())
    }
}
