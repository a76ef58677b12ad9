//! Activity API endpoints.

use std::sync::Arc;

use axum::{extract::State, Extension, Json};

use super::{error, success, ApiResult};
use crate::activities::ActivityEditor;
use crate::errors::AppError;
use crate::models::{Activity, NewActivity};
use crate::session::ClientSession;
use crate::AppState;

/// GET /api/activities, GET /api/admin/activities - Listing, newest first.
pub async fn list_activities(State(state): State<AppState>) -> ApiResult<Vec<Activity>> {
    success(state.activities.listing().await)
}

/// POST /api/admin/activities - Create an activity in one request.
///
/// Runs the same path as the editor: each tag is committed (registering new ones)
/// before the activity itself is written.
pub async fn create_activity(
    State(state): State<AppState>,
    Extension(client): Extension<Arc<ClientSession>>,
    Json(request): Json<NewActivity>,
) -> ApiResult<Activity> {
    let Some(author) = client.session.current_user() else {
        return error(AppError::Unauthorized("Sign in required".to_string()));
    };

    let mut editor = ActivityEditor::open(state.activities.clone(), state.tags.clone()).await;
    let tags = request.tags.clone();
    editor.set_form(request);
    for tag in &tags {
        if let Err(e) = editor.tags_mut().commit_tag(tag).await {
            return error(e);
        }
    }

    match editor.submit(&author).await {
        Ok(activity) => success(activity),
        Err(e) => error(e),
    }
}
