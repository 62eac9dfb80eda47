//! Pre-navigation route guard.
//!
//! `evaluate` is the whole policy: a pure function of the target, the static
//! route meta and whether a credential is present. `Router` only adds route
//! lookup and reads the token store at the moment of each navigation, so
//! every attempt is evaluated independently.

use crate::token::TokenStore;

pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const HOME_PATH: &str = "/";
/// Query parameter carrying the originally requested path.
pub const RETURN_PARAM: &str = "redirect";

/// Static protection flags attached to a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouteMeta {
    pub requires_auth: bool,
    /// Login and register: pointless once authenticated.
    pub guest_only: bool,
}

impl RouteMeta {
    pub const PUBLIC: RouteMeta = RouteMeta {
        requires_auth: false,
        guest_only: false,
    };
    pub const PROTECTED: RouteMeta = RouteMeta {
        requires_auth: true,
        guest_only: false,
    };
    pub const GUEST_ONLY: RouteMeta = RouteMeta {
        requires_auth: false,
        guest_only: true,
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// Go to the login view; `redirect` is the full path originally asked for.
    RedirectToLogin { redirect: String },
    RedirectHome { to: String },
}

impl GuardDecision {
    /// Where the navigation ends up, given the path that was requested.
    pub fn destination<'a>(&'a self, requested: &'a str) -> std::borrow::Cow<'a, str> {
        match self {
            GuardDecision::Allow => requested.into(),
            GuardDecision::RedirectToLogin { redirect } => format!(
                "{LOGIN_PATH}?{RETURN_PARAM}={}",
                urlencoding::encode(redirect)
            )
            .into(),
            GuardDecision::RedirectHome { to } => to.as_str().into(),
        }
    }
}

/// A navigation target split into path and decoded query pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub full_path: String,
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl Navigation {
    pub fn parse(target: &str) -> Self {
        let without_fragment = target.split('#').next().unwrap_or_default();
        let (path, query) = match without_fragment.split_once('?') {
            Some((path, query)) => (path, query),
            None => (without_fragment, ""),
        };
        let query = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode_component(key), decode_component(value))
            })
            .collect();
        Self {
            full_path: target.to_string(),
            path: if path.is_empty() { HOME_PATH.to_string() } else { path.to_string() },
            query,
        }
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(spaced)
}

/// Only same-origin absolute paths are honoured as return targets.
fn is_local_path(candidate: &str) -> bool {
    candidate.starts_with('/') && !candidate.starts_with("//") && !candidate.contains('\\')
}

/// Decide one navigation attempt.
pub fn evaluate(target: &Navigation, meta: RouteMeta, authenticated: bool) -> GuardDecision {
    if meta.requires_auth && !authenticated {
        return GuardDecision::RedirectToLogin {
            redirect: target.full_path.clone(),
        };
    }
    if meta.guest_only && authenticated {
        let to = target
            .query_param(RETURN_PARAM)
            .filter(|candidate| is_local_path(candidate))
            .unwrap_or(HOME_PATH);
        return GuardDecision::RedirectHome { to: to.to_string() };
    }
    GuardDecision::Allow
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub name: String,
    /// Literal segments, or `:name` for a single-segment parameter.
    pub path: String,
    pub meta: RouteMeta,
}

impl Route {
    pub fn new(name: &str, path: &str, meta: RouteMeta) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            meta,
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        let pattern = segments(&self.path);
        let actual = segments(path);
        pattern.len() == actual.len()
            && pattern
                .iter()
                .zip(&actual)
                .all(|(p, a)| (p.starts_with(':') && !a.is_empty()) || p == a)
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect()
}

/// The application's views.
pub fn default_routes() -> Vec<Route> {
    vec![
        Route::new("Dashboard", HOME_PATH, RouteMeta::PROTECTED),
        Route::new("UserSettings", "/settings", RouteMeta::PROTECTED),
        Route::new("EmailDetail", "/emails/:id", RouteMeta::PROTECTED),
        Route::new("Login", LOGIN_PATH, RouteMeta::GUEST_ONLY),
        Route::new("Register", REGISTER_PATH, RouteMeta::GUEST_ONLY),
        Route::new("OAuthCallback", "/oauth/callback", RouteMeta::PUBLIC),
    ]
}

/// Route table plus the credential source the guard consults.
#[derive(Debug, Clone)]
pub struct Router {
    routes: Vec<Route>,
    tokens: TokenStore,
}

impl Router {
    pub fn new(routes: Vec<Route>, tokens: TokenStore) -> Self {
        Self { routes, tokens }
    }

    pub fn with_default_routes(tokens: TokenStore) -> Self {
        Self::new(default_routes(), tokens)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn resolve(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.matches(path))
    }

    /// Unknown paths are treated as public.
    pub fn before_each(&self, target: &str) -> GuardDecision {
        let navigation = Navigation::parse(target);
        let meta = self
            .resolve(&navigation.path)
            .map(|route| route.meta)
            .unwrap_or_default();
        let decision = evaluate(&navigation, meta, self.tokens.has_token());
        tracing::debug!(path = target, ?decision, "route guard evaluated");
        decision
    }
}
