//! crates/reminder_core/src/domain.rs
//!
//! Defines the pure, core data structures for the reminder pipeline.
//! These structs are independent of any database or provider format; serde
//! derives exist only so the presentation layer can hand them across the wire.

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Source Records (read-only input)
//=========================================================================================

/// A single prescribed medication line on a visit record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrescriptionLine {
    pub drug_name: String,
    pub dosage_text: String,
    pub frequency_text: String,
    #[serde(default)]
    pub usage_instructions: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// A medical visit record as supplied by the record store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: String,
    #[serde(default)]
    pub hospital: String,
    #[serde(default)]
    pub clinician_name: String,
    #[serde(default)]
    pub visit_date: Option<chrono::NaiveDate>,
    #[serde(default)]
    pub diagnosis: Vec<String>,
    #[serde(default)]
    pub physician_notes: Option<String>,
    #[serde(default)]
    pub prescriptions: Vec<PrescriptionLine>,
}

//=========================================================================================
// Time of Day
//=========================================================================================

/// A wall-clock time in 24-hour `HH:MM` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a valid HH:MM time of day")]
pub struct InvalidTimeOfDay(pub String);

/// A recurrence or strategy name that is not one of the known values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Result<Self, InvalidTimeOfDay> {
        if hour > 23 || minute > 59 {
            return Err(InvalidTimeOfDay(format!("{hour}:{minute}")));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn to_naive_time(&self) -> NaiveTime {
        // Fields are range-checked at construction.
        NaiveTime::from_hms_opt(u32::from(self.hour), u32::from(self.minute), 0)
            .unwrap_or(NaiveTime::MIN)
    }
}

impl From<NaiveTime> for TimeOfDay {
    fn from(time: NaiveTime) -> Self {
        Self {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
        }
    }
}

impl FromStr for TimeOfDay {
    type Err = InvalidTimeOfDay;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidTimeOfDay(s.to_string());
        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if hour.is_empty() || hour.len() > 2 || minute.len() != 2 || !digits(hour) || !digits(minute) {
            return Err(invalid());
        }
        let hour: u8 = hour.parse().map_err(|_| invalid())?;
        let minute: u8 = minute.parse().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

//=========================================================================================
// Enumerations
//=========================================================================================

/// How a reminder repeats once scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    None,
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Recurrence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Recurrence {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(UnknownVariant {
                kind: "recurrence",
                value: other.to_string(),
            }),
        }
    }
}

/// Which method produced a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStrategy {
    Basic,
    Advanced,
}

impl AnalysisStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Advanced => "advanced",
        }
    }
}

impl fmt::Display for AnalysisStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisStrategy {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "advanced" => Ok(Self::Advanced),
            other => Err(UnknownVariant {
                kind: "analysis strategy",
                value: other.to_string(),
            }),
        }
    }
}

//=========================================================================================
// Analysis Provider Output
//=========================================================================================

/// One reminder proposed by the AI analysis provider.
///
/// `time` stays a raw string here; it is validated when the suggestion is accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancedReminderSuggestion {
    pub medication_name: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub frequency: String,
    #[serde(default)]
    pub instructions: String,
    pub time: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub recommendations: Option<String>,
    #[serde(default)]
    pub recurrence: Option<Recurrence>,
}

//=========================================================================================
// Drafts (staged, session-owned)
//=========================================================================================

/// A staged, user-editable candidate reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderDraft {
    pub id: String,
    pub source_record_id: String,
    pub medication_name: String,
    pub dosage: String,
    pub frequency_text: String,
    pub instructions: String,
    pub notes: Option<String>,
    pub time_of_day: TimeOfDay,
    pub recurrence: Recurrence,
    pub analysis_strategy: AnalysisStrategy,
    pub ai_notes: Option<String>,
    pub ai_recommendations: Option<String>,
    /// Session-local edit counter; 0 means the draft was never edited.
    #[serde(skip)]
    pub revision: u64,
}

//=========================================================================================
// Persistence
//=========================================================================================

/// One medication's worth of merged drafts, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MedicationEntry {
    pub medication_name: String,
    pub dosage: String,
    pub frequency_text: String,
    pub instructions: String,
    pub notes: Option<String>,
    pub times: Vec<TimeOfDay>,
    pub recurrence: Recurrence,
    pub analysis_strategy: AnalysisStrategy,
    pub ai_notes: Option<String>,
    pub ai_recommendations: Option<String>,
}

/// A committed reminder, owned by the persistence store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedReminder {
    pub id: Uuid,
    pub source_record_id: String,
    pub medication_name: String,
    pub dosage: String,
    pub frequency_text: String,
    pub instructions: String,
    pub notes: Option<String>,
    pub times: Vec<TimeOfDay>,
    pub recurrence: Recurrence,
    pub analysis_strategy: AnalysisStrategy,
    pub ai_notes: Option<String>,
    pub ai_recommendations: Option<String>,
    pub enabled: bool,
    pub last_fired_at: Option<DateTime<Utc>>,
    pub notification_handles: Vec<String>,
    /// The local date the reminder was committed on. Weekly and monthly
    /// triggers take their weekday and day of month from it, also when re-armed.
    pub anchor_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// What a scheduled notification displays when it fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
}

impl NotificationContent {
    /// Builds the notification text for a medication: title is the drug,
    /// body is the dosage followed by any instructions.
    pub fn for_medication(medication_name: &str, dosage: &str, instructions: &str) -> Self {
        let body = match (dosage.trim(), instructions.trim()) {
            ("", "") => "Time to take your medication.".to_string(),
            (dosage, "") => dosage.to_string(),
            ("", instructions) => instructions.to_string(),
            (dosage, instructions) => format!("{dosage} - {instructions}"),
        };
        Self {
            title: medication_name.to_string(),
            body,
        }
    }
}
