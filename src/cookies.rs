//! Cookie storage seam.
//!
//! DESIGN
//! ======
//! The session cache only needs get/set/remove by name. HTTP handlers back it
//! with the request's `CookieJar` and hand the updated jar back to Axum so the
//! changes leave as `Set-Cookie` headers; tests back it with an in-memory map
//! that behaves like a browser jar (a zero `Max-Age` deletes).

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use axum_extra::extract::cookie::{Cookie, CookieJar};
use time::Duration;

pub trait CookieStore: Send + Sync {
    /// Decoded value of the named cookie, if present.
    fn get(&self, name: &str) -> Option<String>;

    /// Add or overwrite a cookie.
    fn set(&self, cookie: Cookie<'static>);

    /// Delete the named cookie (path `/`). Removing an absent cookie is a no-op.
    fn remove(&self, name: &str);
}

// =============================================================================
// IN-MEMORY JAR
// =============================================================================

/// Browser-like jar kept in process memory.
#[derive(Default)]
pub struct MemoryCookies {
    cookies: Mutex<HashMap<String, Cookie<'static>>>,
}

impl MemoryCookies {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Full cookie including attributes, for inspection.
    pub fn cookie(&self, name: &str) -> Option<Cookie<'static>> {
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Overwrite a cookie value verbatim, bypassing attribute handling.
    pub fn insert_raw(&self, name: &str, value: &str) {
        self.set(Cookie::new(name.to_owned(), value.to_owned()));
    }
}

impl CookieStore for MemoryCookies {
    fn get(&self, name: &str) -> Option<String> {
        self.cookie(name).map(|c| c.value().to_owned())
    }

    fn set(&self, cookie: Cookie<'static>) {
        let mut cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        if cookie.max_age() == Some(Duration::ZERO) {
            cookies.remove(cookie.name());
        } else {
            cookies.insert(cookie.name().to_owned(), cookie);
        }
    }

    fn remove(&self, name: &str) {
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }
}

// =============================================================================
// REQUEST JAR
// =============================================================================

/// Request-scoped store over Axum's `CookieJar`.
///
/// The jar percent-decodes incoming values and percent-encodes outgoing ones,
/// so JSON payloads travel URL-encoded.
pub struct RequestCookies {
    jar: Mutex<CookieJar>,
}

impl RequestCookies {
    #[must_use]
    pub fn new(jar: CookieJar) -> Self {
        Self { jar: Mutex::new(jar) }
    }

    /// Snapshot of the jar with every change made so far, ready to return
    /// from a handler.
    #[must_use]
    pub fn jar(&self) -> CookieJar {
        self.jar.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl CookieStore for RequestCookies {
    fn get(&self, name: &str) -> Option<String> {
        self.jar
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|c| c.value().to_owned())
    }

    fn set(&self, cookie: Cookie<'static>) {
        let mut jar = self.jar.lock().unwrap_or_else(PoisonError::into_inner);
        *jar = jar.clone().add(cookie);
    }

    fn remove(&self, name: &str) {
        let mut jar = self.jar.lock().unwrap_or_else(PoisonError::into_inner);
        *jar = jar.clone().remove(Cookie::build((name.to_owned(), "")).path("/"));
    }
}

#[cfg(test)]
#[path = "cookies_test.rs"]
mod tests;
