//! Tag API endpoints.

use axum::extract::State;

use super::{success, ApiResult};
use crate::AppState;

/// GET /api/admin/tags - Known tags in registry order. Read failures yield an empty list.
pub async fn list_tags(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    success(state.tags.load_tags().await)
}
