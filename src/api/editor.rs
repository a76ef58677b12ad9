//! Editor API endpoints.
//!
//! Drive the signed-in browser's draft: tag suggestions, selection and submit.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};

use super::{error, success, ApiResult};
use crate::activities::EditorView;
use crate::errors::AppError;
use crate::models::{Activity, CommitTagRequest, NewActivity, SuggestionQuery};
use crate::session::ClientSession;
use crate::tags::TagWidget;
use crate::AppState;

/// GET /api/admin/editor - Current draft.
pub async fn get_editor(
    State(state): State<AppState>,
    Extension(client): Extension<Arc<ClientSession>>,
) -> ApiResult<EditorView> {
    let editor = client.editor(&state.activities, &state.tags).await;
    success(editor.view())
}

/// GET /api/admin/editor/suggestions?q= - Known tags matching the input.
pub async fn suggest_tags(
    State(state): State<AppState>,
    Extension(client): Extension<Arc<ClientSession>>,
    Query(query): Query<SuggestionQuery>,
) -> ApiResult<Vec<String>> {
    let mut editor = client.editor(&state.activities, &state.tags).await;
    success(editor.tags_mut().on_input_change(&query.q).to_vec())
}

/// POST /api/admin/editor/tags - Add a tag to the draft, registering it if new.
pub async fn commit_tag(
    State(state): State<AppState>,
    Extension(client): Extension<Arc<ClientSession>>,
    Json(request): Json<CommitTagRequest>,
) -> ApiResult<TagWidget> {
    let mut editor = client.editor(&state.activities, &state.tags).await;
    match editor.tags_mut().commit_tag(&request.tag).await {
        Ok(_) => success(editor.tags().widget()),
        Err(e) => error(e),
    }
}

/// DELETE /api/admin/editor/tags/{tag} - Drop a tag from the draft.
pub async fn remove_tag(
    State(state): State<AppState>,
    Extension(client): Extension<Arc<ClientSession>>,
    Path(tag): Path<String>,
) -> ApiResult<TagWidget> {
    let mut editor = client.editor(&state.activities, &state.tags).await;
    editor.tags_mut().remove_tag(&tag);
    success(editor.tags().widget())
}

/// POST /api/admin/editor/submit - Submit the draft with these form fields.
pub async fn submit_editor(
    State(state): State<AppState>,
    Extension(client): Extension<Arc<ClientSession>>,
    Json(form): Json<NewActivity>,
) -> ApiResult<Activity> {
    let Some(author) = client.session.current_user() else {
        return error(AppError::Unauthorized("Sign in required".to_string()));
    };

    let mut editor = client.editor(&state.activities, &state.tags).await;
    editor.set_form(form);
    match editor.submit(&author).await {
        Ok(activity) => success(activity),
        Err(e) => error(e),
    }
}
