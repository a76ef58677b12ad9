//! Identity provider contract and its local implementation.
//!
//! A provider instance represents one client's view of authentication: it holds
//! that client's signed-in identity and notifies subscribers whenever it changes.

mod accounts;
mod local;
mod password;

pub use accounts::*;
pub use local::*;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: String,
}

/// Callback invoked with the current identity on every session change.
pub type SessionListener = Arc<dyn Fn(Option<Identity>) + Send + Sync>;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authenticate with email and password.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AppError>;

    /// Forget the signed-in identity.
    async fn sign_out(&self) -> Result<(), AppError>;

    /// Register a listener. It fires immediately with the current identity,
    /// then again on every sign-in and sign-out.
    fn on_session_change(&self, listener: SessionListener) -> Subscription;
}

/// Listeners registered with one provider.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(u64, SessionListener)>>,
}

impl ListenerRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Add a listener and hand back the handle that removes it.
    pub fn subscribe(self: &Arc<Self>, listener: SessionListener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        Subscription {
            id,
            registry: Some(Arc::downgrade(self)),
        }
    }

    /// Call every listener with `identity`.
    ///
    /// Listeners are cloned out first so a listener may unsubscribe from inside the call.
    pub fn notify(&self, identity: Option<Identity>) {
        let listeners: Vec<SessionListener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(identity.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, id: u64) -> bool {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }
}

/// Handle for one registered listener. Released exactly once, on
/// `unsubscribe` or on drop, whichever comes first.
pub struct Subscription {
    id: u64,
    registry: Option<Weak<ListenerRegistry>>,
}

impl Subscription {
    /// Remove the listener. Returns whether it was still registered.
    pub fn unsubscribe(mut self) -> bool {
        self.release()
    }

    fn release(&mut self) -> bool {
        match self.registry.take().and_then(|weak| weak.upgrade()) {
            Some(registry) => registry.remove(self.id),
            None => false,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.registry.is_some())
            .finish()
    }
}
