//! Auth routes: Google sign-in and registration, session status, logout.
//!
//! DESIGN
//! ======
//! Every request is one page load's worth of reconciliation. The `Browser`
//! extractor finds this browser's provider session through the HttpOnly
//! `provider_session` cookie and wraps the request's cookie jar in a
//! `SessionCache`; handlers run an `AuthController` over them and hand the
//! jar back so cookie changes leave as `Set-Cookie` headers.

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use time::Duration;

use super::ApiError;
use crate::auth::flow::AuthFlow;
use crate::auth::provider::PROVIDER_SESSION_DAYS;
use crate::auth::{AuthController, AuthMode, AuthRuntimeState, ProviderSession};
use crate::cookies::{CookieStore, RequestCookies};
use crate::services::session::SessionCache;
use crate::state::AppState;

pub const PROVIDER_COOKIE_NAME: &str = "provider_session";

// =============================================================================
// BROWSER EXTRACTOR
// =============================================================================

/// This browser's cookies and provider session.
pub struct Browser {
    cookies: Arc<RequestCookies>,
    provider: Arc<ProviderSession>,
    /// Registry token, when the browser has a registered provider session.
    token: Option<String>,
}

impl<S> FromRequestParts<S> for Browser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let cookies = Arc::new(RequestCookies::new(CookieJar::from_headers(&parts.headers)));

        let registered = match cookies.get(PROVIDER_COOKIE_NAME) {
            Some(token) => app_state
                .providers
                .lookup(&token)
                .await
                .map(|session| (token, session)),
            None => None,
        };

        Ok(match registered {
            Some((token, provider)) => Self { cookies, provider, token: Some(token) },
            None => {
                if cookies.get(PROVIDER_COOKIE_NAME).is_some() {
                    tracing::debug!("unknown provider session token; treating browser as signed out");
                    cookies.remove(PROVIDER_COOKIE_NAME);
                }
                Self { cookies, provider: app_state.providers.detached(), token: None }
            }
        })
    }
}

impl Browser {
    #[must_use]
    pub fn cache(&self, state: &AppState) -> SessionCache {
        SessionCache::new(self.cookies.clone(), state.session_config(), Arc::clone(&state.clock))
    }

    /// Start a controller for this request. The caller awaits `resolved()`.
    #[must_use]
    pub fn controller(&self, state: &AppState) -> AuthController {
        AuthController::start(self.cache(state), self.provider.as_ref(), state.profiles())
    }

    /// Reconcile cookie, provider, and profile for this request.
    pub async fn reconcile(&self, state: &AppState) -> AuthRuntimeState {
        self.controller(state).resolved().await
    }

    /// Make sure the browser has a registered provider session, issuing the
    /// `provider_session` cookie on first use. Returns whether a new session
    /// was opened.
    pub async fn attach(&mut self, state: &AppState) -> bool {
        if self.token.is_some() {
            return false;
        }
        let (token, provider) = state.providers.open().await;
        let cookie = Cookie::build((PROVIDER_COOKIE_NAME, token.clone()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(state.config.cookie_secure)
            .max_age(Duration::days(PROVIDER_SESSION_DAYS))
            .build();
        self.cookies.set(cookie);
        self.provider = provider;
        self.token = Some(token);
        true
    }

    /// Forget the registered provider session and its cookie.
    pub async fn detach(&mut self, state: &AppState) {
        if let Some(token) = self.token.take() {
            state.providers.close(&token).await;
            self.cookies.remove(PROVIDER_COOKIE_NAME);
        }
        self.provider = state.providers.detached();
    }

    #[must_use]
    pub fn provider(&self) -> &ProviderSession {
        &self.provider
    }

    /// The request's jar with every cookie change made so far.
    #[must_use]
    pub fn jar(&self) -> CookieJar {
        self.cookies.jar()
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Deserialize)]
pub struct CredentialBody {
    #[serde(default)]
    credential: String,
}

/// `GET /api/auth/state`: reconciled runtime state for this browser.
pub async fn auth_state(State(state): State<AppState>, browser: Browser) -> Response {
    let auth = browser.reconcile(&state).await;
    (browser.jar(), Json(auth)).into_response()
}

/// `GET /api/auth/session`: remaining session time, or 204 without a session.
pub async fn session_status(State(state): State<AppState>, browser: Browser) -> Response {
    match browser.cache(&state).status() {
        Some(status) => (browser.jar(), Json(status)).into_response(),
        None => (browser.jar(), StatusCode::NO_CONTENT).into_response(),
    }
}

/// `POST /api/auth/google/login`
pub async fn google_login(
    State(state): State<AppState>,
    browser: Browser,
    Json(body): Json<CredentialBody>,
) -> Response {
    google_sign_in(state, browser, &body.credential, AuthMode::Login).await
}

/// `POST /api/auth/google/register`
pub async fn google_register(
    State(state): State<AppState>,
    browser: Browser,
    Json(body): Json<CredentialBody>,
) -> Response {
    google_sign_in(state, browser, &body.credential, AuthMode::Register).await
}

async fn google_sign_in(state: AppState, mut browser: Browser, credential: &str, mode: AuthMode) -> Response {
    let opened = browser.attach(&state).await;
    let gate = state.profiles();
    let flow = AuthFlow::new(browser.provider(), &gate);

    let outcome = match mode {
        AuthMode::Login => flow.sign_in_with_google(credential).await,
        AuthMode::Register => flow.register_with_google(credential).await,
    };
    if let Err(e) = outcome {
        if browser.provider().current().is_none() {
            browser.cache(&state).clear();
        }
        if opened {
            browser.detach(&state).await;
        }
        return (browser.jar(), ApiError::from_auth(&e, mode)).into_response();
    }

    let auth = browser.reconcile(&state).await;
    (browser.jar(), Json(auth.profile)).into_response()
}

/// `POST /api/auth/logout`: sign out of the provider, clear both cookies.
pub async fn logout(State(state): State<AppState>, mut browser: Browser) -> Response {
    let gate = state.profiles();
    let cache = browser.cache(&state);
    if let Err(e) = AuthFlow::new(browser.provider(), &gate).sign_out(&cache).await {
        tracing::warn!(error = %e, "provider sign-out failed");
    }
    browser.detach(&state).await;
    (browser.jar(), StatusCode::NO_CONTENT).into_response()
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
