//! Route guard.
//!
//! Decides, from session state and the requested path, whether a protected page may
//! render, should show a loading placeholder, or must send the viewer to sign in.

mod middleware;

pub use middleware::*;

use std::sync::Arc;

use crate::session::SessionState;

/// Path of the sign-in page.
pub const SIGN_IN_PATH: &str = "/admin/login";

/// Guard state for the current session and route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// Session not resolved yet.
    Pending,
    /// Resolved without a user on a protected path.
    Unauthorized,
    /// Resolved with a user, or on a public path.
    Authorized,
}

/// What the guarded view should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Render {
    Placeholder,
    Nothing,
    Children,
}

impl From<GuardState> for Render {
    fn from(state: GuardState) -> Self {
        match state {
            GuardState::Pending => Render::Placeholder,
            GuardState::Unauthorized => Render::Nothing,
            GuardState::Authorized => Render::Children,
        }
    }
}

/// Receives the guard's navigation requests.
pub trait Navigator {
    fn navigate(&mut self, to: &str);
}

/// A path that never requires sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicPath {
    Exact(String),
    Prefix(String),
}

impl PublicPath {
    /// `"/about"` is exact, `"/create*"` matches every path starting with `/create`.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_suffix('*') {
            Some(prefix) => PublicPath::Prefix(prefix.to_string()),
            None => PublicPath::Exact(raw.to_string()),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            PublicPath::Exact(p) => p == path,
            PublicPath::Prefix(p) => path.starts_with(p.as_str()),
        }
    }
}

/// The sign-in page and the set of public paths.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    sign_in_path: String,
    public: Vec<PublicPath>,
}

impl RoutePolicy {
    /// The sign-in page is always public.
    pub fn new(sign_in_path: &str, extra_public: &[String]) -> Self {
        let mut public = vec![PublicPath::Exact(sign_in_path.to_string())];
        public.extend(extra_public.iter().map(|p| PublicPath::parse(p)));
        Self {
            sign_in_path: sign_in_path.to_string(),
            public,
        }
    }

    pub fn sign_in_path(&self) -> &str {
        &self.sign_in_path
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public.iter().any(|p| p.matches(path))
    }

    /// Classify one (session, path) pair. Public paths skip the session entirely.
    pub fn classify(&self, session: &SessionState, path: &str) -> GuardState {
        if self.is_public(path) {
            GuardState::Authorized
        } else if session.loading {
            GuardState::Pending
        } else if session.user.is_none() {
            GuardState::Unauthorized
        } else {
            GuardState::Authorized
        }
    }
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self::new(SIGN_IN_PATH, &[])
    }
}

/// Guard for one viewer, re-run whenever its session or route changes.
pub struct RouteGuard {
    policy: Arc<RoutePolicy>,
    state: GuardState,
    redirected_from: Option<String>,
}

impl RouteGuard {
    pub fn new(policy: Arc<RoutePolicy>) -> Self {
        Self {
            policy,
            state: GuardState::Pending,
            redirected_from: None,
        }
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    /// Re-evaluate and decide what to render.
    ///
    /// Entering `Unauthorized` on a path requests one navigation to the sign-in page;
    /// evaluating the same path again does not repeat it.
    pub fn update(
        &mut self,
        session: &SessionState,
        path: &str,
        navigator: &mut dyn Navigator,
    ) -> Render {
        let next = self.policy.classify(session, path);

        if next == GuardState::Unauthorized {
            if self.redirected_from.as_deref() != Some(path) {
                navigator.navigate(self.policy.sign_in_path());
                self.redirected_from = Some(path.to_string());
            }
        } else {
            self.redirected_from = None;
        }

        self.state = next;
        Render::from(next)
    }
}
