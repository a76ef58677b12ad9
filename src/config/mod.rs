//! Configuration module for the kids activities backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::AppError;
use crate::session::DEFAULT_SESSION_TTL;

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
    /// Admin account seeded at startup, if both parts are set
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    /// Extra public paths for the route guard; a trailing `*` marks a prefix
    pub public_paths: Vec<String>,
    /// Idle time before a signed-in session expires
    pub session_ttl: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let db_path = env::var("KIDS_DB_PATH")
            .unwrap_or_else(|_| "./data/app.sqlite".to_string())
            .into();

        let bind_addr = env::var("KIDS_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .map_err(|e| AppError::Internal(format!("Invalid KIDS_BIND_ADDR format: {}", e)))?;

        let log_level = env::var("KIDS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_format = match env::var("KIDS_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let admin_email = env::var("KIDS_ADMIN_EMAIL").ok().filter(|s| !s.is_empty());
        let admin_password = env::var("KIDS_ADMIN_PASSWORD")
            .ok()
            .filter(|s| !s.is_empty());

        let public_paths = env::var("KIDS_PUBLIC_PATHS")
            .map(|raw| parse_path_list(&raw))
            .unwrap_or_default();

        let session_ttl = match env::var("KIDS_SESSION_TTL_SECONDS") {
            Ok(raw) => Duration::from_secs(raw.parse::<u64>().map_err(|e| {
                AppError::Internal(format!("Invalid KIDS_SESSION_TTL_SECONDS: {}", e))
            })?),
            Err(_) => DEFAULT_SESSION_TTL,
        };

        Ok(Self {
            db_path,
            bind_addr,
            log_level,
            log_format,
            admin_email,
            admin_password,
            public_paths,
            session_ttl,
        })
    }

    /// Admin credentials to seed, when fully configured.
    pub fn admin_seed(&self) -> Option<(&str, &str)> {
        match (&self.admin_email, &self.admin_password) {
            (Some(email), Some(password)) => Some((email.as_str(), password.as_str())),
            _ => None,
        }
    }
}

fn parse_path_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}
