//! Session cache: a script-readable cookie mirroring who was last signed in.
//!
//! ARCHITECTURE
//! ============
//! The cookie bridges the gap between page load and the identity provider's
//! first notification, and lets the app notice a stale session on its own.
//! It is not signed and never trusted for authorization.
//!
//! TRADE-OFFS
//! ==========
//! Unreadable or stale records are deleted and reported as "no session"
//! rather than surfaced as errors: forcing a fresh sign-in is preferred over
//! carrying ambiguous state. Writes are best-effort for the same reason.

use std::sync::Arc;

use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use time::Duration;
use tracing::{debug, warn};

use crate::auth::Identity;
use crate::clock::Clock;
use crate::cookies::CookieStore;

pub const SESSION_COOKIE_NAME: &str = "auth_session";

/// Contents of the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedSession {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    /// Capture time, Unix epoch milliseconds.
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub ttl: Duration,
    pub warning: Duration,
    pub secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { ttl: Duration::minutes(30), warning: Duration::minutes(5), secure: false }
    }
}

/// Remaining lifetime of the cached session, as reported to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub remaining_ms: i64,
    pub formatted: String,
    pub expiring_soon: bool,
}

#[derive(Clone)]
pub struct SessionCache {
    cookies: Arc<dyn CookieStore>,
    config: SessionConfig,
    clock: Arc<dyn Clock>,
}

impl SessionCache {
    #[must_use]
    pub fn new(cookies: Arc<dyn CookieStore>, config: SessionConfig, clock: Arc<dyn Clock>) -> Self {
        Self { cookies, config, clock }
    }

    /// Replace the cached session with this identity, stamped now.
    pub fn save(&self, identity: &Identity) {
        let session = CachedSession {
            uid: identity.uid.clone(),
            email: identity.email.clone(),
            display_name: identity.display_name.clone(),
            photo_url: identity.photo_url.clone(),
            timestamp: self.clock.now_millis(),
        };
        let value = match serde_json::to_string(&session) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "session cookie serialization failed");
                return;
            }
        };

        let cookie = Cookie::build((SESSION_COOKIE_NAME, value))
            .path("/")
            .same_site(SameSite::Lax)
            .secure(self.config.secure)
            .max_age(self.config.ttl)
            .build();
        self.cookies.set(cookie);
    }

    /// The cached session if present, readable and unexpired. Anything else
    /// deletes the cookie and yields `None`.
    #[must_use]
    pub fn load(&self) -> Option<CachedSession> {
        let raw = self.cookies.get(SESSION_COOKIE_NAME)?;

        let session: CachedSession = match serde_json::from_str(&raw) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "session cookie unreadable; discarding");
                self.clear();
                return None;
            }
        };

        let age_ms = self.clock.now_millis() - session.timestamp;
        if age_ms > ttl_millis(self.config.ttl) {
            debug!(uid = %session.uid, age_ms, "session cookie expired");
            self.clear();
            return None;
        }

        Some(session)
    }

    /// Whether any session cookie is present, valid or not. No side effects.
    #[must_use]
    pub fn peek(&self) -> bool {
        self.cookies.get(SESSION_COOKIE_NAME).is_some()
    }

    pub fn clear(&self) {
        self.cookies.remove(SESSION_COOKIE_NAME);
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.load().is_some()
    }

    /// Time left before the cached session expires.
    #[must_use]
    pub fn time_remaining(&self) -> Option<Duration> {
        let session = self.load()?;
        let elapsed = Duration::milliseconds(self.clock.now_millis() - session.timestamp);
        let remaining = self.config.ttl - elapsed;
        remaining.is_positive().then_some(remaining)
    }

    /// Whether a valid session has less than the warning threshold left.
    #[must_use]
    pub fn is_expiring_soon(&self) -> bool {
        self.time_remaining().is_some_and(|r| r < self.config.warning)
    }

    #[must_use]
    pub fn status(&self) -> Option<SessionStatus> {
        let remaining = self.time_remaining()?;
        Some(SessionStatus {
            remaining_ms: ttl_millis(remaining),
            formatted: format_remaining(remaining),
            expiring_soon: remaining < self.config.warning,
        })
    }
}

fn ttl_millis(d: Duration) -> i64 {
    i64::try_from(d.whole_milliseconds()).unwrap_or(i64::MAX)
}

/// Render a duration as `H:MM:SS`.
#[must_use]
pub fn format_remaining(remaining: Duration) -> String {
    let total = remaining.whole_seconds().max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
