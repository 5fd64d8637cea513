//! crates/reminder_core/src/analysis.rs
//!
//! Runs one of the two analysis strategies over a batch of source records.
//!
//! The basic strategy reads each prescription line's frequency text. The
//! advanced strategy asks the external `AnalysisProvider` about the whole
//! record and, when that fails for a record, falls back to the basic strategy
//! for that record alone.

use async_trait::async_trait;
use futures::future::join_all;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::{
    AdvancedReminderSuggestion, AnalysisStrategy, PrescriptionLine, SourceRecord, TimeOfDay,
};
use crate::frequency;
use crate::ports::{AnalysisProvider, PortError, PortResult};

//=========================================================================================
// Analysis Output
//=========================================================================================

/// One reminder-to-be, before it becomes a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Suggestion {
    /// Derived from a prescription line by the frequency interpreter.
    Prescribed {
        line: PrescriptionLine,
        time: TimeOfDay,
    },
    /// Returned by the analysis provider, with its time already validated.
    Advanced {
        suggestion: AdvancedReminderSuggestion,
        time: TimeOfDay,
    },
}

/// Everything one record produced, tagged with the strategy that actually ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordAnalysis {
    pub source_record_id: String,
    pub strategy: AnalysisStrategy,
    pub suggestions: Vec<Suggestion>,
}

/// A batch-level notice that is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    /// Advanced analysis was requested but every record fell back to basic.
    FullFallback { records: usize },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FullFallback { records } => write!(
                f,
                "Advanced analysis was unavailable for all {records} record(s); reminders were built from the prescription text instead."
            ),
        }
    }
}

/// The ordered result of analysing a batch of records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    /// One entry per input record, in selection order.
    pub analyses: Vec<RecordAnalysis>,
    pub advisory: Option<Advisory>,
}

//=========================================================================================
// The Analyzer Capability
//=========================================================================================

#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Analyses one record. Never fails; degraded results are tagged instead.
    async fn run(&self, record: &SourceRecord) -> RecordAnalysis;
}

/// Deterministic strategy driven by the frequency interpreter.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicAnalyzer;

impl BasicAnalyzer {
    pub fn analyze(&self, record: &SourceRecord) -> RecordAnalysis {
        let suggestions = record
            .prescriptions
            .iter()
            .flat_map(|line| {
                frequency::interpret(&line.frequency_text)
                    .into_iter()
                    .map(move |time| Suggestion::Prescribed {
                        line: line.clone(),
                        time,
                    })
            })
            .collect();

        RecordAnalysis {
            source_record_id: record.id.clone(),
            strategy: AnalysisStrategy::Basic,
            suggestions,
        }
    }
}

#[async_trait]
impl Analyzer for BasicAnalyzer {
    async fn run(&self, record: &SourceRecord) -> RecordAnalysis {
        self.analyze(record)
    }
}

/// Provider-backed strategy with a per-record basic fallback.
#[derive(Clone)]
pub struct AdvancedAnalyzer {
    provider: Arc<dyn AnalysisProvider>,
    fallback: BasicAnalyzer,
}

impl AdvancedAnalyzer {
    pub fn new(provider: Arc<dyn AnalysisProvider>) -> Self {
        Self {
            provider,
            fallback: BasicAnalyzer,
        }
    }
}

#[async_trait]
impl Analyzer for AdvancedAnalyzer {
    async fn run(&self, record: &SourceRecord) -> RecordAnalysis {
        let accepted = self
            .provider
            .analyze(record)
            .await
            .and_then(accept_suggestions);

        match accepted {
            Ok(suggestions) => {
                info!(
                    "Advanced analysis produced {} reminder(s) for record {}",
                    suggestions.len(),
                    record.id
                );
                RecordAnalysis {
                    source_record_id: record.id.clone(),
                    strategy: AnalysisStrategy::Advanced,
                    suggestions,
                }
            }
            Err(e) => {
                warn!(
                    "Advanced analysis failed for record {}, falling back to basic: {}",
                    record.id, e
                );
                self.fallback.analyze(record)
            }
        }
    }
}

/// Validates provider output. Any unusable entry rejects the whole response.
fn accept_suggestions(raw: Vec<AdvancedReminderSuggestion>) -> PortResult<Vec<Suggestion>> {
    if raw.is_empty() {
        return Err(PortError::InvalidInput(
            "analysis provider returned no reminders".to_string(),
        ));
    }

    raw.into_iter()
        .map(|suggestion| {
            if suggestion.medication_name.trim().is_empty() {
                return Err(PortError::InvalidInput(
                    "analysis provider returned a reminder without a medication name".to_string(),
                ));
            }
            let time = suggestion
                .time
                .parse::<TimeOfDay>()
                .map_err(|e| PortError::InvalidInput(e.to_string()))?;
            Ok(Suggestion::Advanced { suggestion, time })
        })
        .collect()
}

//=========================================================================================
// The Orchestrator
//=========================================================================================

/// Chooses an analyzer for the requested strategy and runs it over a batch.
#[derive(Clone, Default)]
pub struct AnalysisOrchestrator {
    provider: Option<Arc<dyn AnalysisProvider>>,
}

impl AnalysisOrchestrator {
    /// Creates an orchestrator. Without a provider, advanced requests fall
    /// back to basic for every record.
    pub fn new(provider: Option<Arc<dyn AnalysisProvider>>) -> Self {
        Self { provider }
    }

    pub fn analyzer(&self, strategy: AnalysisStrategy) -> Arc<dyn Analyzer> {
        match (strategy, &self.provider) {
            (AnalysisStrategy::Advanced, Some(provider)) => {
                Arc::new(AdvancedAnalyzer::new(provider.clone()))
            }
            (AnalysisStrategy::Advanced, None) => {
                warn!("Advanced analysis requested but no analysis provider is configured.");
                Arc::new(BasicAnalyzer)
            }
            (AnalysisStrategy::Basic, _) => Arc::new(BasicAnalyzer),
        }
    }

    /// Analyses every record, concurrently, keeping selection order.
    pub async fn generate(
        &self,
        strategy: AnalysisStrategy,
        records: &[SourceRecord],
    ) -> GenerationOutcome {
        let analyzer = self.analyzer(strategy);
        let analyses = join_all(records.iter().map(|record| analyzer.run(record))).await;

        let advisory = if strategy == AnalysisStrategy::Advanced
            && !analyses.is_empty()
            && analyses
                .iter()
                .all(|a| a.strategy != AnalysisStrategy::Advanced)
        {
            warn!(
                "Advanced analysis fell back to basic for all {} record(s).",
                analyses.len()
            );
            Some(Advisory::FullFallback {
                records: analyses.len(),
            })
        } else {
            None
        };

        GenerationOutcome { analyses, advisory }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{line, record, suggestion, FakeProvider};

    #[test]
    fn basic_emits_one_suggestion_per_interpreted_time() {
        let rec = record(
            "r1",
            vec![
                line("Amoxicillin", "three times daily"),
                line("Ibuprofen", "once daily"),
                line("Vitamin D", ""),
            ],
        );
        let analysis = BasicAnalyzer.analyze(&rec);
        let expected: usize = rec
            .prescriptions
            .iter()
            .map(|l| frequency::interpret(&l.frequency_text).len())
            .sum();
        assert_eq!(analysis.suggestions.len(), expected);
        assert_eq!(analysis.suggestions.len(), 6);
        assert_eq!(analysis.strategy, AnalysisStrategy::Basic);
    }

    #[tokio::test]
    async fn basic_strategy_never_calls_the_provider() {
        let provider = Arc::new(FakeProvider::default());
        let orchestrator = AnalysisOrchestrator::new(Some(provider.clone()));
        let records = vec![record("r1", vec![line("Aspirin", "once daily")])];

        let outcome = orchestrator.generate(AnalysisStrategy::Basic, &records).await;

        assert_eq!(provider.calls(), 0);
        assert_eq!(outcome.analyses.len(), 1);
        assert!(outcome.advisory.is_none());
    }

    #[tokio::test]
    async fn provider_failure_is_isolated_to_its_record() {
        let provider = Arc::new(
            FakeProvider::default()
                .failing("a")
                .succeeding("b", vec![suggestion("Metformin", "09:00")]),
        );
        let orchestrator = AnalysisOrchestrator::new(Some(provider.clone()));
        let records = vec![
            record("a", vec![line("Aspirin", "twice daily")]),
            record("b", vec![line("Metformin", "once daily")]),
        ];

        let outcome = orchestrator
            .generate(AnalysisStrategy::Advanced, &records)
            .await;

        assert_eq!(provider.calls(), 2);
        assert_eq!(outcome.analyses[0].source_record_id, "a");
        assert_eq!(outcome.analyses[0].strategy, AnalysisStrategy::Basic);
        assert_eq!(outcome.analyses[0].suggestions.len(), 2);
        assert_eq!(outcome.analyses[1].source_record_id, "b");
        assert_eq!(outcome.analyses[1].strategy, AnalysisStrategy::Advanced);
        assert!(outcome.advisory.is_none());
    }

    #[tokio::test]
    async fn universal_failure_raises_advisory() {
        let provider = Arc::new(FakeProvider::default().failing("a").failing("b"));
        let orchestrator = AnalysisOrchestrator::new(Some(provider));
        let records = vec![
            record("a", vec![line("Aspirin", "once")]),
            record("b", vec![line("Zinc", "once")]),
        ];

        let outcome = orchestrator
            .generate(AnalysisStrategy::Advanced, &records)
            .await;

        assert_eq!(outcome.advisory, Some(Advisory::FullFallback { records: 2 }));
        assert!(outcome
            .analyses
            .iter()
            .all(|a| a.strategy == AnalysisStrategy::Basic));
    }

    #[tokio::test]
    async fn malformed_provider_output_falls_back() {
        let provider = Arc::new(
            FakeProvider::default()
                .succeeding("bad-time", vec![suggestion("Aspirin", "noon")])
                .succeeding("empty", vec![]),
        );
        let orchestrator = AnalysisOrchestrator::new(Some(provider));
        let records = vec![
            record("bad-time", vec![line("Aspirin", "once daily")]),
            record("empty", vec![line("Zinc", "once daily")]),
        ];

        let outcome = orchestrator
            .generate(AnalysisStrategy::Advanced, &records)
            .await;

        assert!(outcome
            .analyses
            .iter()
            .all(|a| a.strategy == AnalysisStrategy::Basic));
        assert!(outcome.advisory.is_some());
    }

    #[tokio::test]
    async fn missing_provider_falls_back_everywhere() {
        let orchestrator = AnalysisOrchestrator::new(None);
        let records = vec![record("a", vec![line("Aspirin", "once daily")])];

        let outcome = orchestrator
            .generate(AnalysisStrategy::Advanced, &records)
            .await;

        assert_eq!(outcome.analyses[0].strategy, AnalysisStrategy::Basic);
        assert_eq!(outcome.advisory, Some(Advisory::FullFallback { records: 1 }));
    }

    #[tokio::test]
    async fn empty_batch_has_no_advisory() {
        let orchestrator = AnalysisOrchestrator::new(None);
        let outcome = orchestrator.generate(AnalysisStrategy::Advanced, &[]).await;
        assert!(outcome.analyses.is_empty());
        assert!(outcome.advisory.is_none());
    }
}
