//! services/api/src/adapters/analysis_llm.rs
//!
//! This module contains the adapter for the prescription-analysis LLM.
//! It implements the `AnalysisProvider` port from the `core` crate.

const SYSTEM_INSTRUCTIONS: &str = r#"You are a clinical pharmacy assistant that turns a medical visit record into medication reminders.

For every medication the patient should take, produce one reminder per dose time.

Respond with ONLY a JSON array. Each element must be an object with these fields:
- "medication_name": the drug name exactly as prescribed
- "dosage": the amount per dose (e.g. "500mg", "1 tablet")
- "frequency": the prescribed frequency in plain words
- "instructions": how to take it (e.g. "after meals", "with water")
- "time": the dose time in 24-hour "HH:MM" form
- "notes": optional short caution relevant to the diagnosis, or null
- "recommendations": optional short lifestyle or monitoring advice, or null
- "recurrence": one of "daily", "weekly", "monthly", "none"; use "daily" unless the prescription clearly says otherwise

Spread multiple daily doses sensibly across waking hours and respect meal-related instructions.
Do not invent medications that are not in the record. Do not add any text outside the JSON array."#;

use async_openai::{
    config::OpenAIConfig,
    types::{
        chat::ChatCompletionRequestSystemMessageArgs, chat::ChatCompletionRequestUserMessageArgs,
        chat::CreateChatCompletionRequestArgs,
    },
    Client, error::OpenAIError,
};
use async_trait::async_trait;
use regex::Regex;
use reminder_core::{
    domain::{AdvancedReminderSuggestion, SourceRecord},
    ports::{AnalysisProvider, PortError, PortResult},
};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `AnalysisProvider` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiAnalysisAdapter {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

impl OpenAiAnalysisAdapter {
    /// Creates a new `OpenAiAnalysisAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String, timeout: Duration) -> Self {
        Self {
            client,
            model,
            timeout,
        }
    }

    /// Renders a visit record as the user message sent to the model.
    fn describe_record(record: &SourceRecord) -> String {
        let mut text = format!(
            "HOSPITAL: {}\nCLINICIAN: {}\n",
            record.hospital, record.clinician_name
        );
        if let Some(date) = record.visit_date {
            text.push_str(&format!("VISIT DATE: {}\n", date));
        }
        if !record.diagnosis.is_empty() {
            text.push_str(&format!("DIAGNOSIS: {}\n", record.diagnosis.join("; ")));
        }
        if let Some(notes) = record.physician_notes.as_deref().filter(|n| !n.trim().is_empty()) {
            text.push_str(&format!("PHYSICIAN NOTES: {}\n", notes));
        }
        text.push_str("PRESCRIPTIONS:\n");
        for line in &record.prescriptions {
            text.push_str(&format!(
                "- {} | dosage: {} | frequency: {} | usage: {}",
                line.drug_name, line.dosage_text, line.frequency_text, line.usage_instructions
            ));
            if let Some(note) = line.note.as_deref().filter(|n| !n.trim().is_empty()) {
                text.push_str(&format!(" | note: {}", note));
            }
            text.push('\n');
        }
        text
    }

    /// Extracts the suggestion list from the raw model text.
    ///
    /// Accepts a bare JSON array or one wrapped in a markdown code fence.
    pub fn parse_suggestions(raw: &str) -> PortResult<Vec<AdvancedReminderSuggestion>> {
        static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
        let fence = FENCE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").ok());

        let body = fence
            .as_ref()
            .and_then(|re| re.captures(raw))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .unwrap_or(raw)
            .trim();

        serde_json::from_str::<Vec<AdvancedReminderSuggestion>>(body).map_err(|e| {
            PortError::InvalidInput(format!("Analysis LLM returned malformed JSON: {}", e))
        })
    }

    async fn request_analysis(&self, record: &SourceRecord) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(Self::describe_record(record))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .temperature(0.2)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Map the client error into the port error by hand.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unexpected(
                    "Analysis LLM response contained no text content.".to_string(),
                )
            })
    }
}

//=========================================================================================
// `AnalysisProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl AnalysisProvider for OpenAiAnalysisAdapter {
    /// Asks the model for reminders covering the whole record.
    async fn analyze(&self, record: &SourceRecord) -> PortResult<Vec<AdvancedReminderSuggestion>> {
        info!("Requesting advanced analysis for record {}", record.id);

        let raw = tokio::time::timeout(self.timeout, self.request_analysis(record))
            .await
            .map_err(|_| {
                PortError::Unexpected(format!(
                    "Analysis LLM timed out after {}s",
                    self.timeout.as_secs()
                ))
            })??;

        debug!("Analysis LLM output for record {}:\n{}", record.id, raw);
        Self::parse_suggestions(&raw)
    }
}
