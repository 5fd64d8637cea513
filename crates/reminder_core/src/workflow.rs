//! crates/reminder_core/src/workflow.rs
//!
//! The explicit state machine around one prescription-to-reminder run:
//!
//! ```text
//! Idle -> Generating -> Previewing <-> Editing -> Committing -> Done
//!                            \            /
//!                             -> Cancelled
//! ```
//!
//! Every other transition is rejected with `WorkflowError::IllegalTransition`
//! and leaves the state untouched.

use serde::Serialize;
use std::fmt;

use crate::analysis::{Advisory, AnalysisOrchestrator};
use crate::commit::CommitReport;
use crate::domain::{AnalysisStrategy, Recurrence, ReminderDraft, SourceRecord, TimeOfDay};
use crate::drafts::build_drafts;
use crate::session::{PreviewSession, SessionError};

/// The externally visible phase of a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Generating,
    Previewing,
    Editing,
    Committing,
    Done,
    Cancelled,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Generating => "generating",
            Self::Previewing => "previewing",
            Self::Editing => "editing",
            Self::Committing => "committing",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("Cannot {action} while {from}")]
    IllegalTransition { from: Phase, action: &'static str },
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[derive(Debug)]
enum State {
    Idle,
    Generating,
    Previewing(PreviewSession),
    Editing {
        session: PreviewSession,
        draft_id: String,
    },
    Committing,
    Done(CommitReport),
    Cancelled,
}

impl State {
    fn phase(&self) -> Phase {
        match self {
            Self::Idle => Phase::Idle,
            Self::Generating => Phase::Generating,
            Self::Previewing(_) => Phase::Previewing,
            Self::Editing { .. } => Phase::Editing,
            Self::Committing => Phase::Committing,
            Self::Done(_) => Phase::Done,
            Self::Cancelled => Phase::Cancelled,
        }
    }
}

#[derive(Debug)]
pub struct Workflow {
    state: State,
    advisory: Option<Advisory>,
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new()
    }
}

impl Workflow {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            advisory: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn advisory(&self) -> Option<&Advisory> {
        self.advisory.as_ref()
    }

    /// The staged drafts while previewing or editing.
    pub fn session(&self) -> Option<&PreviewSession> {
        match &self.state {
            State::Previewing(session) | State::Editing { session, .. } => Some(session),
            _ => None,
        }
    }

    /// The draft currently being edited.
    pub fn editing(&self) -> Option<&str> {
        match &self.state {
            State::Editing { draft_id, .. } => Some(draft_id),
            _ => None,
        }
    }

    pub fn report(&self) -> Option<&CommitReport> {
        match &self.state {
            State::Done(report) => Some(report),
            _ => None,
        }
    }

    fn illegal(&self, action: &'static str) -> WorkflowError {
        WorkflowError::IllegalTransition {
            from: self.phase(),
            action,
        }
    }

    // --- Generating ---

    pub fn begin_generation(&mut self) -> Result<(), WorkflowError> {
        match self.state {
            State::Idle => {
                self.state = State::Generating;
                Ok(())
            }
            _ => Err(self.illegal("start generating")),
        }
    }

    pub fn finish_generation(
        &mut self,
        drafts: Vec<ReminderDraft>,
        advisory: Option<Advisory>,
    ) -> Result<(), WorkflowError> {
        match self.state {
            State::Generating => {
                self.state = State::Previewing(PreviewSession::from_drafts(drafts));
                self.advisory = advisory;
                Ok(())
            }
            _ => Err(self.illegal("finish generating")),
        }
    }

    /// Runs analysis and draft building, leaving the workflow in `Previewing`.
    pub async fn generate(
        &mut self,
        orchestrator: &AnalysisOrchestrator,
        strategy: AnalysisStrategy,
        records: &[SourceRecord],
    ) -> Result<&PreviewSession, WorkflowError> {
        self.begin_generation()?;
        let outcome = orchestrator.generate(strategy, records).await;
        let drafts = build_drafts(&outcome.analyses);
        self.finish_generation(drafts, outcome.advisory)?;
        self.session().ok_or_else(|| self.illegal("read the preview"))
    }

    // --- Previewing / Editing ---

    pub fn begin_edit(&mut self, draft_id: &str) -> Result<(), WorkflowError> {
        let session = match std::mem::replace(&mut self.state, State::Idle) {
            State::Previewing(session) => session,
            other => {
                self.state = other;
                return Err(self.illegal("start editing"));
            }
        };
        if session.get(draft_id).is_none() {
            self.state = State::Previewing(session);
            return Err(SessionError::NotFound(draft_id.to_string()).into());
        }
        self.state = State::Editing {
            session,
            draft_id: draft_id.to_string(),
        };
        Ok(())
    }

    /// Applies the edit to the draft chosen in `begin_edit` and returns to `Previewing`.
    pub fn apply_edit(
        &mut self,
        time_of_day: TimeOfDay,
        recurrence: Recurrence,
    ) -> Result<&ReminderDraft, WorkflowError> {
        let (mut session, draft_id) = match std::mem::replace(&mut self.state, State::Idle) {
            State::Editing { session, draft_id } => (session, draft_id),
            other => {
                self.state = other;
                return Err(self.illegal("apply an edit"));
            }
        };
        let edited = session.edit(&draft_id, time_of_day, recurrence).map(|_| ());
        self.state = State::Previewing(session);
        edited?;

        self.session()
            .and_then(|s| s.get(&draft_id))
            .ok_or_else(|| SessionError::NotFound(draft_id).into())
    }

    /// Leaves `Editing` without changing anything.
    pub fn discard_edit(&mut self) -> Result<(), WorkflowError> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Editing { session, .. } => {
                self.state = State::Previewing(session);
                Ok(())
            }
            other => {
                self.state = other;
                Err(self.illegal("discard an edit"))
            }
        }
    }

    /// Deletes a draft while previewing. Absent ids are a no-op.
    pub fn delete(&mut self, draft_id: &str) -> Result<bool, WorkflowError> {
        if let State::Previewing(session) = &mut self.state {
            return Ok(session.delete(draft_id));
        }
        Err(self.illegal("delete a draft"))
    }

    pub fn cancel(&mut self) -> Result<(), WorkflowError> {
        match self.state {
            State::Previewing(_) | State::Editing { .. } => {
                self.state = State::Cancelled;
                Ok(())
            }
            _ => Err(self.illegal("cancel")),
        }
    }

    // --- Committing ---

    /// Hands the surviving drafts to the caller and enters `Committing`.
    ///
    /// From `Editing`, the pending edit is dropped and the drafts are
    /// committed as they currently stand.
    pub fn begin_commit(&mut self) -> Result<Vec<ReminderDraft>, WorkflowError> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Previewing(session) | State::Editing { session, .. } => {
                self.state = State::Committing;
                Ok(session.into_drafts())
            }
            other => {
                self.state = other;
                Err(self.illegal("commit"))
            }
        }
    }

    pub fn finish_commit(&mut self, report: CommitReport) -> Result<&CommitReport, WorkflowError> {
        match self.state {
            State::Committing => {
                self.state = State::Done(report);
                self.report().ok_or_else(|| self.illegal("read the report"))
            }
            _ => Err(self.illegal("finish committing")),
        }
    }
}
