//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-preview state.

use crate::config::Config;
use chrono::{DateTime, Utc};
use reminder_core::ports::{AnalysisProvider, NotificationScheduler, PersistenceStore};
use reminder_core::{ActiveReminders, AnalysisOrchestrator, CommitAdapter, Phase, Workflow};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub config: Arc<Config>,
    pub orchestrator: AnalysisOrchestrator,
    pub commit_adapter: CommitAdapter,
    pub reminders: ActiveReminders,
    pub previews: Mutex<HashMap<Uuid, PreviewState>>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn PersistenceStore>,
        scheduler: Arc<dyn NotificationScheduler>,
        analysis_provider: Option<Arc<dyn AnalysisProvider>>,
    ) -> Self {
        Self {
            config,
            orchestrator: AnalysisOrchestrator::new(analysis_provider),
            commit_adapter: CommitAdapter::new(store.clone(), scheduler.clone()),
            reminders: ActiveReminders::new(store, scheduler),
            previews: Mutex::new(HashMap::new()),
        }
    }

    /// Locks the preview map after evicting previews older than the configured TTL.
    pub async fn lock_previews(&self) -> MutexGuard<'_, HashMap<Uuid, PreviewState>> {
        let mut previews = self.previews.lock().await;
        let now = Utc::now();
        let ttl = self.config.preview_ttl;
        let before = previews.len();
        previews.retain(|_, preview| !preview.is_expired(now, ttl));
        let evicted = before - previews.len();
        if evicted > 0 {
            info!("Evicted {} expired preview(s)", evicted);
        }
        previews
    }
}

//=========================================================================================
// PreviewState (Specific to One Preview)
//=========================================================================================

/// The state for a single preview, from generation until commit or cancellation.
pub struct PreviewState {
    pub workflow: Workflow,
    /// A token to stop the remaining record groups of an in-flight commit.
    pub cancellation_token: CancellationToken,
    pub created_at: DateTime<Utc>,
}

impl PreviewState {
    pub fn new(workflow: Workflow) -> Self {
        Self {
            workflow,
            cancellation_token: CancellationToken::new(),
            created_at: Utc::now(),
        }
    }

    /// An in-flight commit never expires; its handler removes it when done.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        if self.workflow.phase() == Phase::Committing {
            return false;
        }
        match (now - self.created_at).to_std() {
            Ok(age) => age > ttl,
            Err(_) => false,
        }
    }
}
