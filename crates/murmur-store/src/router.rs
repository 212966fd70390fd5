//! Navigation guard.
//!
//! The [`Router`] is a route table plus a pure predicate evaluated before
//! each route change. It consults only persisted storage, never the live
//! [`crate::Store`], so the two can disagree (for example, a token removed
//! from storage behind the store's back still lets the in-memory session
//! look logged in).

use crate::{Storage, TOKEN_KEY};

/// Path of the login view.
pub const LOGIN_PATH: &str = "/login";

/// A navigable view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Path, e.g. `/`.
    pub path: String,
    /// Route name.
    pub name: String,
    /// Unauthenticated access redirects to login.
    pub requires_auth: bool,
}

impl Route {
    /// Public route.
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self { path: path.into(), name: name.into(), requires_auth: false }
    }

    /// Mark this route as requiring a session.
    #[must_use]
    pub fn requiring_auth(mut self) -> Self {
        self.requires_auth = true;
        self
    }
}

/// Outcome of a guarded navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Navigation may continue to the requested route.
    Proceed,
    /// Navigation must go to this path instead.
    Redirect(String),
}

/// Route table with an authentication guard.
#[derive(Debug, Clone)]
pub struct Router {
    routes: Vec<Route>,
    login_path: String,
}

impl Default for Router {
    /// Home (authenticated), login, and register views.
    fn default() -> Self {
        Self::new(
            vec![
                Route::new("/", "home").requiring_auth(),
                Route::new(LOGIN_PATH, "login"),
                Route::new("/register", "register"),
            ],
            LOGIN_PATH,
        )
    }
}

impl Router {
    /// Create a router over `routes`, redirecting to `login_path`.
    pub fn new(routes: Vec<Route>, login_path: impl Into<String>) -> Self {
        Self { routes, login_path: login_path.into() }
    }

    /// Route matching `target`, ignoring query string and fragment.
    pub fn resolve(&self, target: &str) -> Option<&Route> {
        let path = target.split(['?', '#']).next().unwrap_or(target);
        let path = if path.len() > 1 { path.trim_end_matches('/') } else { path };
        self.routes.iter().find(|route| route.path == path)
    }

    /// Decide whether navigation to `target` may proceed.
    ///
    /// Unknown targets declare no auth requirement and proceed. A storage
    /// read failure counts as "no credential".
    pub fn guard<S: Storage>(&self, target: &str, storage: &S) -> Navigation {
        let Some(route) = self.resolve(target) else {
            return Navigation::Proceed;
        };
        if !route.requires_auth {
            return Navigation::Proceed;
        }

        let has_credential = match storage.get(TOKEN_KEY) {
            Ok(token) => token.is_some_and(|t| !t.trim().is_empty()),
            Err(error) => {
                tracing::warn!(%error, "failed to read credential; treating as logged out");
                false
            },
        };

        if has_credential {
            Navigation::Proceed
        } else {
            tracing::debug!(%target, "unauthenticated navigation redirected to login");
            Navigation::Redirect(self.login_path.clone())
        }
    }
}
