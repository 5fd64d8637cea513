//! crates/reminder_core/src/trigger.rs
//!
//! Maps an abstract recurrence plus a time of day onto the concrete trigger
//! descriptor handed to the notification scheduler.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{Recurrence, TimeOfDay};

/// When the external scheduler should fire a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerSpec {
    /// Fire once after the given delay.
    Once {
        /// Delay in seconds, never less than 1.
        seconds: u64,
    },
    /// Fire every day at a fixed wall-clock time.
    Daily { hour: u8, minute: u8 },
    /// Fire every week on a fixed weekday.
    Weekly {
        /// 1 = Sunday through 7 = Saturday.
        weekday: u8,
        hour: u8,
        minute: u8,
    },
    /// Fire every month on a fixed day of the month.
    ///
    /// Days past 28 are passed through as-is; how a month without that day is
    /// handled is up to the scheduler.
    Monthly { day: u8, hour: u8, minute: u8 },
}

impl TriggerSpec {
    pub fn repeats(&self) -> bool {
        !matches!(self, Self::Once { .. })
    }
}

impl fmt::Display for TriggerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Once { seconds } => write!(f, "once in {seconds}s"),
            Self::Daily { hour, minute } => write!(f, "daily at {hour:02}:{minute:02}"),
            Self::Weekly {
                weekday,
                hour,
                minute,
            } => write!(f, "weekly on day {weekday} at {hour:02}:{minute:02}"),
            Self::Monthly { day, hour, minute } => {
                write!(f, "monthly on day {day} at {hour:02}:{minute:02}")
            }
        }
    }
}

/// Builds the trigger for one reminder time.
///
/// `anchor` supplies the date for one-shot reminders, the weekday for weekly
/// ones and the day of month for monthly ones. It is captured here once; the
/// returned trigger does not depend on it afterwards.
pub fn to_trigger(
    recurrence: Recurrence,
    time: TimeOfDay,
    anchor: NaiveDate,
    now: NaiveDateTime,
) -> TriggerSpec {
    let (hour, minute) = (time.hour(), time.minute());
    match recurrence {
        Recurrence::None => {
            let fire_at = anchor.and_time(time.to_naive_time());
            let seconds = (fire_at - now).num_seconds().max(1) as u64;
            TriggerSpec::Once { seconds }
        }
        Recurrence::Daily => TriggerSpec::Daily { hour, minute },
        Recurrence::Weekly => TriggerSpec::Weekly {
            weekday: anchor.weekday().number_from_sunday() as u8,
            hour,
            minute,
        },
        Recurrence::Monthly => TriggerSpec::Monthly {
            day: anchor.day() as u8,
            hour,
            minute,
        },
    }
}
