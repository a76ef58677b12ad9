//! HTML pages: the public listing, sign-in and the admin dashboard.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Extension, Form,
};
use axum_extra::extract::cookie::CookieJar;
use minijinja::{context, Value};
use serde::Deserialize;

use crate::api::{end_session, start_session};
use crate::errors::AppError;
use crate::models::{AgeRange, LoginRequest, NewActivity, SuggestionQuery};
use crate::session::{clear_session_cookie, session_cookie, ClientSession};
use crate::AppState;

/// Where a successful sign-in lands.
const DASHBOARD_PATH: &str = "/admin/activities";

fn render(state: &AppState, name: &str, ctx: Value) -> Result<Html<String>, AppError> {
    Ok(Html(state.templates.render(name, ctx)?))
}

/// GET / - Public listing.
pub async fn home(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let activities = state.activities.listing().await;
    render(&state, "listing.html", context! { activities })
}

/// GET /admin/login - Sign-in form. Signed-in visitors go straight to the dashboard.
pub async fn login_page(State(state): State<AppState>, jar: CookieJar) -> Response {
    let signed_in = match state.sessions.by_cookie(&jar).await {
        Some(client) => client.session.state().is_signed_in(),
        None => false,
    };
    if signed_in {
        return Redirect::to(DASHBOARD_PATH).into_response();
    }
    render(&state, "login.html", context! {}).into_response()
}

/// POST /admin/login - Sign in from the form.
pub async fn login_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginRequest>,
) -> Response {
    match start_session(&state, &jar, &form.email, &form.password).await {
        Ok((token, _)) => {
            (jar.add(session_cookie(token)), Redirect::to(DASHBOARD_PATH)).into_response()
        }
        Err(e) => {
            let page = render(
                &state,
                "login.html",
                context! { error => e.message(), email => form.email },
            );
            (e.status_code(), page).into_response()
        }
    }
}

/// POST /admin/logout - Sign out and return to the public site.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    end_session(&state, &jar).await;
    (jar.add(clear_session_cookie()), Redirect::to("/"))
}

/// GET /admin/activities - Dashboard.
pub async fn admin_activities(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let activities = state.activities.listing().await;
    render(&state, "admin_activities.html", context! { activities })
}

/// GET /admin/activities/create - Editor page; `q` refreshes tag suggestions.
pub async fn create_page(
    State(state): State<AppState>,
    Extension(client): Extension<Arc<ClientSession>>,
    Query(query): Query<SuggestionQuery>,
) -> Result<Html<String>, AppError> {
    let mut editor = client.editor(&state.activities, &state.tags).await;
    if !query.q.is_empty() {
        editor.tags_mut().on_input_change(&query.q);
    }
    render(
        &state,
        "create_activity.html",
        context! { editor => editor.view() },
    )
}

/// Editor form as posted by the browser. Numbers arrive as text.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateForm {
    pub action: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub min_age: String,
    pub max_age: String,
    pub price: String,
    pub date: String,
    pub time: String,
    pub category: String,
    pub image_url: String,
    pub tag_input: String,
}

/// Which button submitted the editor form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormAction {
    Suggest,
    /// Commit the tag input, or the named suggestion.
    AddTag(Option<String>),
    RemoveTag(String),
    Submit,
}

impl FromStr for FormAction {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if let Some(tag) = raw.strip_prefix("add_tag:") {
            return Ok(FormAction::AddTag(Some(tag.to_string())));
        }
        if let Some(tag) = raw.strip_prefix("remove_tag:") {
            return Ok(FormAction::RemoveTag(tag.to_string()));
        }
        match raw {
            "suggest" => Ok(FormAction::Suggest),
            "add_tag" => Ok(FormAction::AddTag(None)),
            "submit" | "" => Ok(FormAction::Submit),
            other => Err(AppError::BadRequest(format!("Unknown action: {}", other))),
        }
    }
}

impl CreateForm {
    /// Form fields as an activity draft, plus any problems with the numeric fields.
    /// Unparseable numbers fall back to zero.
    pub fn to_activity(&self) -> (NewActivity, Vec<String>) {
        let mut problems = Vec::new();
        let min = parse_number(&self.min_age, "Minimum age", &mut problems);
        let max = parse_number(&self.max_age, "Maximum age", &mut problems);
        let price = parse_number(&self.price, "Price", &mut problems);

        let fields = NewActivity {
            title: self.title.clone(),
            description: self.description.clone(),
            location: self.location.clone(),
            age_range: AgeRange { min, max },
            price,
            date: self.date.clone(),
            time: self.time.clone(),
            category: self.category.trim().to_string(),
            tags: Vec::new(),
            image_url: Some(self.image_url.trim().to_string()).filter(|s| !s.is_empty()),
        };
        (fields, problems)
    }
}

fn parse_number<T: FromStr + Default>(raw: &str, label: &str, problems: &mut Vec<String>) -> T {
    let raw = raw.trim();
    if raw.is_empty() {
        return T::default();
    }
    raw.parse().unwrap_or_else(|_| {
        problems.push(format!("{} must be a number", label));
        T::default()
    })
}

/// POST /admin/activities/create - Apply one editor action and redisplay the page.
///
/// The page status follows the action: a rejected number, tag or submit keeps the
/// draft on screen with the matching error status.
pub async fn create_submit(
    State(state): State<AppState>,
    Extension(client): Extension<Arc<ClientSession>>,
    Form(form): Form<CreateForm>,
) -> Result<(StatusCode, Html<String>), AppError> {
    let author = client
        .session
        .current_user()
        .ok_or_else(|| AppError::Unauthorized("Sign in required".to_string()))?;
    let action: FormAction = form.action.parse()?;
    let (fields, mut problems) = form.to_activity();
    let mut status = StatusCode::OK;

    let mut editor = client.editor(&state.activities, &state.tags).await;
    editor.set_form(fields);
    editor.tags_mut().on_input_change(&form.tag_input);

    match action {
        FormAction::Suggest => {}
        FormAction::AddTag(named) => {
            let result = match named {
                Some(tag) => editor.tags_mut().commit_tag(&tag).await,
                None => editor.tags_mut().confirm().await,
            };
            if let Err(e) = result {
                problems.push(format!("Failed to add tag: {}", e.message()));
                status = e.status_code();
            }
        }
        FormAction::RemoveTag(tag) => {
            editor.tags_mut().remove_tag(&tag);
        }
        FormAction::Submit if problems.is_empty() => {
            // The editor notice carries the message
            if let Err(e) = editor.submit(&author).await {
                status = e.status_code();
            }
        }
        FormAction::Submit => status = StatusCode::BAD_REQUEST,
    }

    let page = render(
        &state,
        "create_activity.html",
        context! { editor => editor.view(), error => problems.join(". ") },
    )?;
    Ok((status, page))
}
