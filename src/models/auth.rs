//! Sign-in request bodies.

use serde::Deserialize;

/// Email and password, from the JSON API or the login form.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}
