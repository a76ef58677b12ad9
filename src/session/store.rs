//! Server-held client sessions keyed by the session cookie.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tokio::sync::{Mutex, MutexGuard, OnceCell};

use super::SessionContext;
use crate::activities::{ActivityEditor, ActivityService};
use crate::errors::AppError;
use crate::identity::{Identity, IdentityProvider};
use crate::tags::TagRegistry;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "kids_session";

/// Idle time after which a session is dropped.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(8 * 60 * 60);

const MAX_SESSIONS: usize = 10_000;

/// Everything the server keeps for one signed-in browser.
pub struct ClientSession {
    pub session: SessionContext,
    editor: OnceCell<Mutex<ActivityEditor>>,
}

impl ClientSession {
    pub fn new(session: SessionContext) -> Self {
        Self {
            session,
            editor: OnceCell::new(),
        }
    }

    /// Attach a session context to `provider` and sign in through it.
    ///
    /// The context is torn down again if sign-in fails.
    pub async fn sign_in(
        provider: Arc<dyn IdentityProvider>,
        email: &str,
        password: &str,
    ) -> Result<(Self, Identity), AppError> {
        let session = SessionContext::attach(provider);
        match session.sign_in_with_email(email, password).await {
            Ok(identity) => Ok((Self::new(session), identity)),
            Err(err) => {
                session.teardown();
                Err(err)
            }
        }
    }

    /// The editor draft for this browser, opened on first use.
    pub async fn editor(
        &self,
        activities: &ActivityService,
        registry: &TagRegistry,
    ) -> MutexGuard<'_, ActivityEditor> {
        self.editor
            .get_or_init(|| async {
                Mutex::new(ActivityEditor::open(activities.clone(), registry.clone()).await)
            })
            .await
            .lock()
            .await
    }

    /// Sign out and release the session subscription.
    pub async fn close(&self) -> Result<(), AppError> {
        let result = self.session.sign_out().await;
        self.session.teardown();
        result
    }
}

struct SessionEntry {
    client: Arc<ClientSession>,
    expires_at: Instant,
}

#[derive(Default)]
struct Sessions {
    entries: HashMap<String, SessionEntry>,
    /// Tokens in insertion order, oldest first.
    order: VecDeque<String>,
}

impl Sessions {
    fn remove(&mut self, token: &str) -> Option<Arc<ClientSession>> {
        let entry = self.entries.remove(token)?;
        self.order.retain(|t| t != token);
        Some(entry.client)
    }

    fn cleanup_expired(&mut self, now: Instant) -> Vec<Arc<ClientSession>> {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(token, _)| token.clone())
            .collect();
        expired
            .iter()
            .filter_map(|token| self.remove(token))
            .collect()
    }

    fn prune_overflow(&mut self, max_sessions: usize) -> Vec<Arc<ClientSession>> {
        let mut evicted = Vec::new();
        while self.entries.len() > max_sessions {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if let Some(entry) = self.entries.remove(&oldest) {
                evicted.push(entry.client);
            }
        }
        evicted
    }
}

/// Live client sessions. Idle sessions expire and the oldest are evicted past capacity.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<Sessions>>,
    ttl: Duration,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_SESSION_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self::with_limits(ttl, MAX_SESSIONS)
    }

    pub fn with_limits(ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(Sessions::default())),
            ttl,
            max_sessions,
        }
    }

    /// Register a session under a fresh random token.
    pub async fn insert(&self, client: ClientSession) -> (String, Arc<ClientSession>) {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let client = Arc::new(client);

        let stale = {
            let mut sessions = self.sessions.lock().await;
            let now = Instant::now();
            let mut stale = sessions.cleanup_expired(now);
            sessions.entries.insert(
                token.clone(),
                SessionEntry {
                    client: Arc::clone(&client),
                    expires_at: now + self.ttl,
                },
            );
            sessions.order.push_back(token.clone());
            stale.extend(sessions.prune_overflow(self.max_sessions));
            stale
        };
        close_all(stale).await;

        (token, client)
    }

    /// Live session for `token`. A hit pushes its expiry out by another TTL.
    pub async fn get(&self, token: &str) -> Option<Arc<ClientSession>> {
        let (found, expired) = {
            let mut sessions = self.sessions.lock().await;
            let now = Instant::now();
            let expired = sessions.cleanup_expired(now);
            let found = sessions.entries.get_mut(token).map(|entry| {
                entry.expires_at = now + self.ttl;
                Arc::clone(&entry.client)
            });
            (found, expired)
        };
        close_all(expired).await;
        found
    }

    pub async fn remove(&self, token: &str) -> Option<Arc<ClientSession>> {
        self.sessions.lock().await.remove(token)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.entries.len()
    }

    /// Look up the session named by the request's cookie.
    pub async fn by_cookie(&self, jar: &CookieJar) -> Option<Arc<ClientSession>> {
        let token = session_token(jar)?;
        self.get(&token).await
    }

    pub async fn by_headers(&self, headers: &HeaderMap) -> Option<Arc<ClientSession>> {
        self.by_cookie(&CookieJar::from_headers(headers)).await
    }
}

/// Sign out sessions dropped from the store.
async fn close_all(clients: impl IntoIterator<Item = Arc<ClientSession>>) {
    for client in clients {
        tracing::debug!("Closing expired client session");
        if let Err(e) = client.close().await {
            tracing::warn!("Error closing expired session: {}", e);
        }
    }
}

/// Session token from the request's cookies, if present.
pub fn session_token(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

/// Cookie establishing a session.
pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Cookie clearing the session.
pub fn clear_session_cookie() -> Cookie<'static> {
    let mut cookie = session_cookie(String::new());
    cookie.make_removal();
    cookie
}
