//! Account storage for the local identity provider.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use super::password::{hash_password, verify_password};
use super::Identity;
use crate::errors::AppError;

/// Email/password accounts kept in the `accounts` table.
#[derive(Clone)]
pub struct AccountStore {
    pool: SqlitePool,
}

impl AccountStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create an account, or reset the password of an existing one.
    pub async fn upsert_account(&self, email: &str, password: &str) -> Result<Identity, AppError> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AppError::Validation(
                "Email and password are required".to_string(),
            ));
        }

        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))??;

        let uid = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO accounts (uid, email, password_hash, created_at) VALUES (?, ?, ?, ?) ON CONFLICT(email) DO UPDATE SET password_hash = excluded.password_hash",
        )
        .bind(&uid)
        .bind(&email)
        .bind(&password_hash)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(AppError::store_write)?;

        let row = sqlx::query("SELECT uid FROM accounts WHERE email = ?")
            .bind(&email)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::store_read)?;

        Ok(Identity {
            uid: row.get("uid"),
            email,
        })
    }

    /// Check credentials. `Ok(None)` means unknown email or wrong password.
    pub async fn verify(&self, email: &str, password: &str) -> Result<Option<Identity>, AppError> {
        let email = normalize_email(email);
        let row = sqlx::query("SELECT uid, password_hash FROM accounts WHERE email = ?")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::store_read)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let uid: String = row.get("uid");
        let stored_hash: String = row.get("password_hash");
        let password = password.to_string();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
            .await
            .map_err(|e| AppError::Internal(format!("Verification task failed: {}", e)))??;

        Ok(matches.then_some(Identity { uid, email }))
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
