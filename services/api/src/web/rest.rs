//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::{
    protocol::{
        CommitResponse, CreatePreviewRequest, DraftView, EditDraftRequest, FailedGroupView,
        PreviewResponse, ReminderView, ToggleReminderRequest,
    },
    state::{AppState, PreviewState},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::Local;
use reminder_core::{
    ports::PortError, Phase, Recurrence, SessionError, TimeOfDay, Workflow, WorkflowError,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::OpenApi;
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        create_preview_handler,
        get_preview_handler,
        edit_draft_handler,
        delete_draft_handler,
        commit_preview_handler,
        cancel_preview_handler,
        list_reminders_handler,
        toggle_reminder_handler,
        delete_reminder_handler,
    ),
    components(
        schemas(
            CreatePreviewRequest,
            EditDraftRequest,
            ToggleReminderRequest,
            DraftView,
            PreviewResponse,
            FailedGroupView,
            CommitResponse,
            ReminderView,
        )
    ),
    tags(
        (name = "Medication Reminder API", description = "Turns prescription records into reviewed, scheduled medication reminders.")
    )
)]
pub struct ApiDoc;

type HandlerError = (StatusCode, String);

//=========================================================================================
// Error Mapping
//=========================================================================================

fn port_error(context: &str, e: PortError) -> HandlerError {
    match e {
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        PortError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
        PortError::Unexpected(msg) => {
            error!("{}: {}", context, msg);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{} failed", context))
        }
    }
}

fn workflow_error(e: WorkflowError) -> HandlerError {
    match e {
        WorkflowError::Session(SessionError::NotFound(id)) => {
            (StatusCode::NOT_FOUND, format!("Draft {} not found", id))
        }
        illegal @ WorkflowError::IllegalTransition { .. } => {
            (StatusCode::CONFLICT, illegal.to_string())
        }
    }
}

fn preview_not_found(preview_id: Uuid) -> HandlerError {
    (
        StatusCode::NOT_FOUND,
        format!("Preview {} not found", preview_id),
    )
}

//=========================================================================================
// Preview Handlers
//=========================================================================================

/// Analyse the selected records and stage the resulting drafts.
#[utoipa::path(
    post,
    path = "/previews",
    request_body = CreatePreviewRequest,
    responses(
        (status = 201, description = "Preview created", body = PreviewResponse),
        (status = 400, description = "No records were selected")
    )
)]
pub async fn create_preview_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreatePreviewRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    if payload.records.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "At least one record must be selected".to_string(),
        ));
    }

    info!(
        "Generating {} preview for {} record(s)",
        payload.strategy,
        payload.records.len()
    );
    let mut workflow = Workflow::new();
    workflow
        .generate(&app_state.orchestrator, payload.strategy, &payload.records)
        .await
        .map_err(workflow_error)?;

    let preview_id = Uuid::new_v4();
    let preview = PreviewState::new(workflow);
    let response = PreviewResponse::from_state(preview_id, &preview);
    app_state.lock_previews().await.insert(preview_id, preview);

    Ok((StatusCode::CREATED, Json(response)))
}

/// Fetch the current drafts of a preview.
#[utoipa::path(
    get,
    path = "/previews/{preview_id}",
    params(("preview_id" = Uuid, Path, description = "The preview to read.")),
    responses(
        (status = 200, description = "Current preview", body = PreviewResponse),
        (status = 404, description = "Unknown preview")
    )
)]
pub async fn get_preview_handler(
    State(app_state): State<Arc<AppState>>,
    Path(preview_id): Path<Uuid>,
) -> Result<Json<PreviewResponse>, HandlerError> {
    let previews = app_state.lock_previews().await;
    let preview = previews
        .get(&preview_id)
        .ok_or_else(|| preview_not_found(preview_id))?;
    Ok(Json(PreviewResponse::from_state(preview_id, preview)))
}

/// Change the time of day and recurrence of one draft.
#[utoipa::path(
    patch,
    path = "/previews/{preview_id}/drafts/{draft_id}",
    request_body = EditDraftRequest,
    params(
        ("preview_id" = Uuid, Path, description = "The preview holding the draft."),
        ("draft_id" = String, Path, description = "The draft to edit.")
    ),
    responses(
        (status = 200, description = "Draft updated", body = DraftView),
        (status = 400, description = "Invalid time or recurrence"),
        (status = 404, description = "Unknown preview or draft"),
        (status = 409, description = "The preview is no longer editable")
    )
)]
pub async fn edit_draft_handler(
    State(app_state): State<Arc<AppState>>,
    Path((preview_id, draft_id)): Path<(Uuid, String)>,
    Json(payload): Json<EditDraftRequest>,
) -> Result<Json<DraftView>, HandlerError> {
    let time_of_day = payload
        .time_of_day
        .parse::<TimeOfDay>()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let recurrence = payload
        .recurrence
        .parse::<Recurrence>()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let mut previews = app_state.lock_previews().await;
    let preview = previews
        .get_mut(&preview_id)
        .ok_or_else(|| preview_not_found(preview_id))?;

    preview
        .workflow
        .begin_edit(&draft_id)
        .map_err(workflow_error)?;
    let edited = preview
        .workflow
        .apply_edit(time_of_day, recurrence)
        .map_err(workflow_error)?;

    Ok(Json(DraftView::from(edited)))
}

/// Remove a draft from a preview. Removing an absent draft succeeds.
#[utoipa::path(
    delete,
    path = "/previews/{preview_id}/drafts/{draft_id}",
    params(
        ("preview_id" = Uuid, Path, description = "The preview holding the draft."),
        ("draft_id" = String, Path, description = "The draft to remove.")
    ),
    responses(
        (status = 204, description = "Draft removed (or was already absent)"),
        (status = 404, description = "Unknown preview"),
        (status = 409, description = "The preview is no longer editable")
    )
)]
pub async fn delete_draft_handler(
    State(app_state): State<Arc<AppState>>,
    Path((preview_id, draft_id)): Path<(Uuid, String)>,
) -> Result<StatusCode, HandlerError> {
    let mut previews = app_state.lock_previews().await;
    let preview = previews
        .get_mut(&preview_id)
        .ok_or_else(|| preview_not_found(preview_id))?;

    preview
        .workflow
        .delete(&draft_id)
        .map_err(workflow_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Persist and schedule every remaining draft, then discard the preview.
#[utoipa::path(
    post,
    path = "/previews/{preview_id}/commit",
    params(("preview_id" = Uuid, Path, description = "The preview to commit.")),
    responses(
        (status = 200, description = "Commit finished; check failed_groups for partial failures", body = CommitResponse),
        (status = 404, description = "Unknown preview"),
        (status = 409, description = "The preview is not in a committable phase")
    )
)]
pub async fn commit_preview_handler(
    State(app_state): State<Arc<AppState>>,
    Path(preview_id): Path<Uuid>,
) -> Result<Json<CommitResponse>, HandlerError> {
    // The lock is released while the commit talks to the store and scheduler.
    let (drafts, cancellation_token) = {
        let mut previews = app_state.lock_previews().await;
        let preview = previews
            .get_mut(&preview_id)
            .ok_or_else(|| preview_not_found(preview_id))?;
        let drafts = preview.workflow.begin_commit().map_err(workflow_error)?;
        (drafts, preview.cancellation_token.clone())
    };

    info!("Committing {} draft(s) from preview {}", drafts.len(), preview_id);
    let report = app_state
        .commit_adapter
        .commit(&drafts, Local::now().naive_local(), &cancellation_token)
        .await;

    if let Some(mut preview) = app_state.lock_previews().await.remove(&preview_id) {
        if let Err(e) = preview.workflow.finish_commit(report.clone()) {
            warn!("Preview {} could not record its commit: {}", preview_id, e);
        }
    }

    Ok(Json(CommitResponse::from(report)))
}

/// Abandon a preview. During a commit this stops the groups not yet sent.
#[utoipa::path(
    delete,
    path = "/previews/{preview_id}",
    params(("preview_id" = Uuid, Path, description = "The preview to cancel.")),
    responses(
        (status = 202, description = "Commit in progress; remaining groups will be skipped"),
        (status = 204, description = "Preview cancelled"),
        (status = 404, description = "Unknown preview")
    )
)]
pub async fn cancel_preview_handler(
    State(app_state): State<Arc<AppState>>,
    Path(preview_id): Path<Uuid>,
) -> Result<StatusCode, HandlerError> {
    let mut previews = app_state.lock_previews().await;
    let preview = previews
        .get_mut(&preview_id)
        .ok_or_else(|| preview_not_found(preview_id))?;

    if preview.workflow.phase() == Phase::Committing {
        info!("Cancelling the remainder of the commit for preview {}", preview_id);
        preview.cancellation_token.cancel();
        return Ok(StatusCode::ACCEPTED);
    }

    preview.workflow.cancel().map_err(workflow_error)?;
    previews.remove(&preview_id);
    info!("Preview {} cancelled", preview_id);
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Reminder Handlers
//=========================================================================================

/// List committed reminders.
#[utoipa::path(
    get,
    path = "/reminders",
    responses(
        (status = 200, description = "All committed reminders", body = [ReminderView]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_reminders_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<ReminderView>>, HandlerError> {
    let reminders = app_state
        .reminders
        .list()
        .await
        .map_err(|e| port_error("Listing reminders", e))?;
    Ok(Json(reminders.into_iter().map(ReminderView::from).collect()))
}

/// Enable or disable a committed reminder.
#[utoipa::path(
    patch,
    path = "/reminders/{reminder_id}",
    request_body = ToggleReminderRequest,
    params(("reminder_id" = Uuid, Path, description = "The reminder to toggle.")),
    responses(
        (status = 200, description = "Reminder updated", body = ReminderView),
        (status = 404, description = "Unknown reminder")
    )
)]
pub async fn toggle_reminder_handler(
    State(app_state): State<Arc<AppState>>,
    Path(reminder_id): Path<Uuid>,
    Json(payload): Json<ToggleReminderRequest>,
) -> Result<Json<ReminderView>, HandlerError> {
    let reminder = app_state
        .reminders
        .set_enabled(reminder_id, payload.enabled, Local::now().naive_local())
        .await
        .map_err(|e| port_error("Updating reminder", e))?;
    Ok(Json(ReminderView::from(reminder)))
}

/// Delete a committed reminder and cancel its notifications.
#[utoipa::path(
    delete,
    path = "/reminders/{reminder_id}",
    params(("reminder_id" = Uuid, Path, description = "The reminder to delete.")),
    responses(
        (status = 204, description = "Reminder deleted"),
        (status = 404, description = "Unknown reminder")
    )
)]
pub async fn delete_reminder_handler(
    State(app_state): State<Arc<AppState>>,
    Path(reminder_id): Path<Uuid>,
) -> Result<StatusCode, HandlerError> {
    app_state
        .reminders
        .remove(reminder_id)
        .await
        .map_err(|e| port_error("Deleting reminder", e))?;
    Ok(StatusCode::NO_CONTENT)
}
