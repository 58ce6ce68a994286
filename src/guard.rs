//! Route guard for page requests.
//!
//! Pages other than the public ones need a signed-in identity. A visitor
//! without one is sent to `/login` with the page they wanted and why, so the
//! login page can explain an expired session and return them afterwards.

use serde::Serialize;

use crate::auth::AuthRuntimeState;

pub const LOGIN_PATH: &str = "/login";
pub const DEFAULT_LANDING_PATH: &str = "/home";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RedirectReason {
    Expired,
    Unauthenticated,
}

impl RedirectReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Expired => "expired",
            Self::Unauthenticated => "unauthenticated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Reconciliation has not finished; nothing can be decided yet.
    Loading,
    Allow,
    Redirect { to: String, from: String, reason: RedirectReason },
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
    public_paths: Vec<String>,
}

impl RouteGuard {
    #[must_use]
    pub fn new(public_paths: Vec<String>) -> Self {
        Self { public_paths }
    }

    /// Exact match, or a sub-path of a public path.
    #[must_use]
    pub fn is_public(&self, path: &str) -> bool {
        self.public_paths.iter().any(|p| {
            path == p
                || path
                    .strip_prefix(p.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    /// Judge a page request. `target` is the path with its query, if any;
    /// a redirect carries it whole as `from`.
    #[must_use]
    pub fn decide(&self, state: &AuthRuntimeState, target: &str) -> GuardDecision {
        if state.loading {
            return GuardDecision::Loading;
        }
        if self.is_public(path_of(target)) || state.identity.is_some() {
            return GuardDecision::Allow;
        }
        let reason = if state.session_expired { RedirectReason::Expired } else { RedirectReason::Unauthenticated };
        GuardDecision::Redirect { to: LOGIN_PATH.to_owned(), from: target.to_owned(), reason }
    }
}

/// `/login?from=…&reason=…` with `from` percent-encoded.
#[must_use]
pub fn login_redirect_url(from: &str, reason: RedirectReason) -> String {
    format!("{LOGIN_PATH}?from={}&reason={}", urlencoding::encode(from), reason.as_str())
}

/// Where a signed-in visitor of the login page goes: back to `from` when it
/// is a local absolute path, otherwise the landing page.
#[must_use]
pub fn post_login_destination(from: Option<&str>) -> &str {
    match from {
        Some(target) if is_local_path(target) && path_of(target) != LOGIN_PATH => target,
        _ => DEFAULT_LANDING_PATH,
    }
}

fn path_of(target: &str) -> &str {
    target.split_once('?').map_or(target, |(path, _)| path)
}

fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') && !path.contains("://")
}

/// Requests for files (anything whose last segment has an extension) rather
/// than pages.
#[must_use]
pub fn is_asset(path: &str) -> bool {
    path.rsplit('/').next().is_some_and(|segment| segment.contains('.'))
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
