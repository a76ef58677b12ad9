//! Identity provider backed by the local account store.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use super::{AccountStore, Identity, IdentityProvider, ListenerRegistry, SessionListener, Subscription};
use crate::errors::AppError;

/// One client's authentication state over the shared account store.
pub struct LocalIdentityProvider {
    accounts: AccountStore,
    current: Mutex<Option<Identity>>,
    listeners: Arc<ListenerRegistry>,
}

impl LocalIdentityProvider {
    pub fn new(accounts: AccountStore) -> Self {
        Self {
            accounts,
            current: Mutex::new(None),
            listeners: ListenerRegistry::new(),
        }
    }

    /// The signed-in identity, if any.
    pub fn current_user(&self) -> Option<Identity> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of live session listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn transition(&self, identity: Option<Identity>) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = identity.clone();
        self.listeners.notify(identity);
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AppError> {
        let verified = self.accounts.verify(email, password).await.map_err(|err| {
            tracing::warn!("Sign-in failed for {}: {}", email, err);
            AppError::Authentication(format!("Sign-in unavailable: {}", err.message()))
        })?;

        match verified {
            Some(identity) => {
                tracing::info!("User {} signed in", identity.email);
                self.transition(Some(identity.clone()));
                Ok(identity)
            }
            None => {
                tracing::warn!("Sign-in rejected for {}", email);
                Err(AppError::Authentication(
                    "Invalid email or password".to_string(),
                ))
            }
        }
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        if let Some(identity) = self.current_user() {
            tracing::info!("User {} signed out", identity.email);
        }
        self.transition(None);
        Ok(())
    }

    fn on_session_change(&self, listener: SessionListener) -> Subscription {
        let current = self.current_user();
        let subscription = self.listeners.subscribe(Arc::clone(&listener));
        listener(current);
        subscription
    }
}
