//! Route guard as axum middleware.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
};

use super::{Navigator, Render, RouteGuard};
use crate::errors::AppError;
use crate::session::SessionState;
use crate::AppState;

/// Collects the guard's navigation target for a redirect response.
#[derive(Debug, Default)]
pub struct RedirectNavigator {
    target: Option<String>,
}

impl RedirectNavigator {
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }
}

impl Navigator for RedirectNavigator {
    fn navigate(&mut self, to: &str) {
        self.target = Some(to.to_string());
    }
}

/// Guard every request behind the session named by its cookie.
///
/// A request without a live session is treated as resolved and signed out. Authorized
/// requests carry their `Arc<ClientSession>` as an extension when one exists.
pub async fn route_guard_layer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let client = state.sessions.by_headers(request.headers()).await;
    let session = client
        .as_ref()
        .map(|c| c.session.state())
        .unwrap_or_else(|| SessionState::resolved(None));

    let mut guard = RouteGuard::new(Arc::clone(&state.policy));
    let mut navigator = RedirectNavigator::default();

    match guard.update(&session, &path, &mut navigator) {
        Render::Children => {
            if let Some(client) = client {
                request.extensions_mut().insert(client);
            }
            next.run(request).await
        }
        Render::Placeholder if is_api(&path) => AppError::SessionPending.into_response(),
        Render::Placeholder => loading_response(&state),
        Render::Nothing if is_api(&path) => {
            AppError::Unauthorized("Sign in required".to_string()).into_response()
        }
        Render::Nothing => {
            tracing::debug!("Redirecting unauthenticated request for {}", path);
            let target = navigator
                .target()
                .unwrap_or_else(|| state.policy.sign_in_path());
            Redirect::to(target).into_response()
        }
    }
}

fn is_api(path: &str) -> bool {
    path.starts_with("/api/")
}

fn loading_response(state: &AppState) -> Response {
    match state.templates.render("loading.html", minijinja::context! {}) {
        Ok(body) => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::RETRY_AFTER, "1")],
            Html(body),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
