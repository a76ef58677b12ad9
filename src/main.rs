//! Local Kids Activities Backend
//!
//! Public activity listing plus a signed-in admin area for creating activities,
//! served from SQLite with server-side sessions.

mod activities;
mod api;
mod config;
mod db;
mod errors;
mod guard;
mod identity;
mod models;
mod normalize;
mod pages;
mod session;
mod tags;
mod templates;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use activities::ActivityService;
use config::{Config, LogFormat};
use db::{DocumentStore, SqliteDocumentStore};
use guard::{RoutePolicy, SIGN_IN_PATH};
use identity::AccountStore;
use session::SessionStore;
use tags::TagRegistry;
use templates::{MiniJinjaEngine, TemplateEngine};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountStore,
    pub sessions: SessionStore,
    pub activities: ActivityService,
    pub tags: TagRegistry,
    pub policy: Arc<RoutePolicy>,
    pub templates: Arc<dyn TemplateEngine>,
}

impl AppState {
    /// Wire every service onto one SQLite pool.
    pub fn new(pool: SqlitePool, config: &Config) -> Self {
        let store: Arc<dyn DocumentStore> = Arc::new(SqliteDocumentStore::new(pool.clone()));
        Self {
            accounts: AccountStore::new(pool),
            sessions: SessionStore::with_ttl(config.session_ttl),
            activities: ActivityService::new(Arc::clone(&store)),
            tags: TagRegistry::new(store),
            policy: Arc::new(RoutePolicy::new(SIGN_IN_PATH, &config.public_paths)),
            templates: Arc::new(MiniJinjaEngine::new()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(env_filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    tracing::info!("Starting Local Kids Activities Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;

    // Seed the admin account
    let accounts = AccountStore::new(pool.clone());
    match config.admin_seed() {
        Some((email, password)) => {
            let admin = accounts.upsert_account(email, password).await?;
            tracing::info!("Admin account ready: {}", admin.email);
        }
        None => {
            tracing::warn!(
                "No admin account configured (KIDS_ADMIN_EMAIL / KIDS_ADMIN_PASSWORD). \
                 Only existing accounts can sign in."
            );
        }
    }

    let state = AppState::new(pool, &config);

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Admin pages and admin API, behind the route guard. Paths stay un-nested so
    // the guard sees the full request path.
    let admin_routes = Router::new()
        .route(
            "/admin/login",
            get(pages::login_page).post(pages::login_submit),
        )
        .route("/admin/logout", post(pages::logout))
        .route("/admin/activities", get(pages::admin_activities))
        .route(
            "/admin/activities/create",
            get(pages::create_page).post(pages::create_submit),
        )
        // Activities
        .route("/api/admin/activities", get(api::list_activities))
        .route("/api/admin/activities", post(api::create_activity))
        // Tags
        .route("/api/admin/tags", get(api::list_tags))
        // Editor
        .route("/api/admin/editor", get(api::get_editor))
        .route("/api/admin/editor/suggestions", get(api::suggest_tags))
        .route("/api/admin/editor/tags", post(api::commit_tag))
        .route("/api/admin/editor/tags/{tag}", delete(api::remove_tag))
        .route("/api/admin/editor/submit", post(api::submit_editor))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            guard::route_guard_layer,
        ));

    // Public pages, listing and session endpoints
    let public_routes = Router::new()
        .route("/", get(pages::home))
        .route("/api/activities", get(api::list_activities))
        .route("/api/auth/session", get(api::get_session))
        .route("/api/auth/login", post(api::login))
        .route("/api/auth/logout", post(api::logout))
        .route("/health", get(health_check));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
