//! Session API endpoints and the sign-in plumbing shared with the pages.

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use axum_extra::extract::cookie::CookieJar;

use super::{success, ApiResponse, ApiResult};
use crate::errors::AppError;
use crate::identity::{Identity, LocalIdentityProvider};
use crate::models::LoginRequest;
use crate::session::{
    clear_session_cookie, session_cookie, session_token, ClientSession, SessionState,
};
use crate::AppState;

/// Sign in and register a new client session. Returns its cookie token.
///
/// Any session already named by the request's cookie is closed first.
pub async fn start_session(
    state: &AppState,
    jar: &CookieJar,
    email: &str,
    password: &str,
) -> Result<(String, Identity), AppError> {
    end_session(state, jar).await;

    let provider = Arc::new(LocalIdentityProvider::new(state.accounts.clone()));
    let (client, identity) = ClientSession::sign_in(provider, email, password).await?;
    let (token, _) = state.sessions.insert(client).await;
    Ok((token, identity))
}

/// Close and forget the session named by the request's cookie, if any.
pub async fn end_session(state: &AppState, jar: &CookieJar) {
    let Some(token) = session_token(jar) else {
        return;
    };
    if let Some(client) = state.sessions.remove(&token).await {
        if let Err(e) = client.close().await {
            tracing::warn!("Error signing out: {}", e);
        }
    }
}

/// POST /api/auth/login - Sign in with email and password.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (token, identity) =
        start_session(&state, &jar, &request.email, &request.password).await?;

    Ok((jar.add(session_cookie(token)), ApiResponse::new(identity)))
}

/// POST /api/auth/logout - Sign out and clear the session cookie.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    end_session(&state, &jar).await;
    (jar.add(clear_session_cookie()), ApiResponse::new(()))
}

/// GET /api/auth/session - Current `{ user, loading }`.
pub async fn get_session(State(state): State<AppState>, jar: CookieJar) -> ApiResult<SessionState> {
    let session = state
        .sessions
        .by_cookie(&jar)
        .await
        .map(|client| client.session.state())
        .unwrap_or_else(|| SessionState::resolved(None));
    success(session)
}
