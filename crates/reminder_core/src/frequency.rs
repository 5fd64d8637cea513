//! crates/reminder_core/src/frequency.rs
//!
//! Turns a free-text dosage frequency ("twice daily", "tid", "1일 3회") into the
//! canonical times of day a reminder should fire.

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::domain::TimeOfDay;

/// Canonical (hour, minute) sets for one to four doses per day.
const ONCE: &[(u8, u8)] = &[(8, 0)];
const TWICE: &[(u8, u8)] = &[(8, 0), (20, 0)];
const THREE_TIMES: &[(u8, u8)] = &[(8, 0), (13, 0), (20, 0)];
const FOUR_TIMES: &[(u8, u8)] = &[(8, 0), (12, 0), (16, 0), (20, 0)];

/// Ordered from the highest count down; the first pattern that matches wins.
fn patterns() -> &'static [(Regex, &'static [(u8, u8)])] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static [(u8, u8)])>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let table: [(&str, &'static [(u8, u8)]); 4] = [
            (
                r"(?i)\b(?:four|4)\s*(?:times|x)\b|\bq\.?i\.?d\b|\bq\s*6\s*h\b|\bevery\s+6\s+hours\b|(?:1\s*일|하루)\s*(?:4|네)\s*(?:회|번)|每[日天]\s*(?:4|四)\s*次",
                FOUR_TIMES,
            ),
            (
                r"(?i)\b(?:three|3)\s*(?:times|x)\b|\bt\.?i\.?d\b|\bq\s*8\s*h\b|\bevery\s+8\s+hours\b|(?:1\s*일|하루)\s*(?:3|세)\s*(?:회|번)|每[日天]\s*(?:3|三)\s*次",
                THREE_TIMES,
            ),
            (
                r"(?i)\btwice\b|\b(?:two|2)\s*(?:times|x)\b|\bb\.?i\.?d\b|\bq\s*12\s*h\b|\bevery\s+12\s+hours\b|(?:1\s*일|하루)\s*(?:2|두)\s*(?:회|번)|每[日天]\s*(?:2|二|两)\s*次",
                TWICE,
            ),
            (
                r"(?i)\bonce\b|\b(?:one|1)\s*(?:time|x)\b|\bq\.?d\b|\bo\.?d\b|\bq\s*24\s*h\b|\bevery\s+24\s+hours\b|(?:1\s*일|하루)\s*(?:1|한)\s*(?:회|번)|每[日天]\s*(?:1|一)\s*次",
                ONCE,
            ),
        ];
        table
            .into_iter()
            .filter_map(|(pattern, times)| match Regex::new(pattern) {
                Ok(re) => Some((re, times)),
                Err(e) => {
                    debug!("Skipping invalid frequency pattern: {}", e);
                    None
                }
            })
            .collect()
    })
}

fn to_times(raw: &[(u8, u8)]) -> Vec<TimeOfDay> {
    raw.iter()
        .filter_map(|&(hour, minute)| TimeOfDay::new(hour, minute).ok())
        .collect()
}

/// Maps a frequency description to an ordered set of times of day.
///
/// Never fails: empty or unrecognized text yields the twice-daily set
/// `{08:00, 20:00}` so a reminder can still be created.
pub fn interpret(frequency_text: &str) -> Vec<TimeOfDay> {
    let text = frequency_text.trim();
    if !text.is_empty() {
        if let Some((_, times)) = patterns().iter().find(|(re, _)| re.is_match(text)) {
            return to_times(times);
        }
    }
    debug!(
        "Frequency '{}' not recognized, defaulting to twice daily",
        frequency_text
    );
    to_times(TWICE)
}
