pub mod protocol;
pub mod rest;
pub mod state;

use axum::{
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;

pub use rest::{
    cancel_preview_handler, commit_preview_handler, create_preview_handler, delete_draft_handler,
    delete_reminder_handler, edit_draft_handler, get_preview_handler, list_reminders_handler,
    toggle_reminder_handler,
};
use state::AppState;

/// Builds the API routes. CORS and Swagger UI are layered on by the binary.
pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/previews", post(create_preview_handler))
        .route(
            "/previews/{preview_id}",
            get(get_preview_handler).delete(cancel_preview_handler),
        )
        .route(
            "/previews/{preview_id}/drafts/{draft_id}",
            patch(edit_draft_handler).delete(delete_draft_handler),
        )
        .route("/previews/{preview_id}/commit", post(commit_preview_handler))
        .route("/reminders", get(list_reminders_handler))
        .route(
            "/reminders/{reminder_id}",
            patch(toggle_reminder_handler).delete(delete_reminder_handler),
        )
        .with_state(app_state)
}
