//! Session state manager.
//!
//! `SessionContext` turns an identity provider's session-change stream into
//! `{ user, loading }` state that route guards and handlers read.

mod store;

pub use store::*;

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::Serialize;

use crate::errors::AppError;
use crate::identity::{Identity, IdentityProvider, SessionListener, Subscription};

/// Authentication status as seen by the rest of the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub user: Option<Identity>,
    pub loading: bool,
}

impl SessionState {
    /// Before the first session-change event.
    pub fn pending() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }

    pub fn resolved(user: Option<Identity>) -> Self {
        Self {
            user,
            loading: false,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        !self.loading && self.user.is_some()
    }
}

/// Session state for one client, fed by its identity provider.
pub struct SessionContext {
    provider: Arc<dyn IdentityProvider>,
    state: Arc<RwLock<SessionState>>,
    subscription: Mutex<Option<Subscription>>,
}

impl SessionContext {
    /// Start in the pending state and subscribe to session changes.
    pub fn attach(provider: Arc<dyn IdentityProvider>) -> Self {
        let state = Arc::new(RwLock::new(SessionState::pending()));

        let sink = Arc::downgrade(&state);
        let listener: SessionListener = Arc::new(move |user| {
            if let Some(state) = sink.upgrade() {
                *state.write().unwrap_or_else(PoisonError::into_inner) =
                    SessionState::resolved(user);
            }
        });
        let subscription = provider.on_session_change(listener);

        Self {
            provider,
            state,
            subscription: Mutex::new(Some(subscription)),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn current_user(&self) -> Option<Identity> {
        self.state().user
    }

    /// Sign in through the provider. State changes arrive via the session stream.
    pub async fn sign_in_with_email(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, AppError> {
        self.provider.sign_in(email, password).await
    }

    pub async fn sign_out(&self) -> Result<(), AppError> {
        self.provider.sign_out().await
    }

    /// Whether the session subscription is still live.
    pub fn is_attached(&self) -> bool {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Unsubscribe from session changes. Only the first call releases anything.
    pub fn teardown(&self) -> bool {
        let subscription = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match subscription {
            Some(subscription) => subscription.unsubscribe(),
            None => false,
        }
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.teardown();
    }
}
