//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! JSON endpoints under `/api` drive the login page, profile editing, and the
//! schedule form. Every other path is a page served from the web directory
//! behind the route guard, so a signed-out visitor asking for a page is
//! redirected to `/login` before any HTML leaves the server.

pub mod auth;
pub mod pages;
pub mod profile;
pub mod schedules;
#[cfg(test)]
pub mod test_client;

use std::path::Path;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::auth::{AuthError, AuthMode, ProviderError};
use crate::services::profile::ProfileError;
use crate::services::schedule::ScheduleError;
use crate::state::AppState;
use crate::store::StoreError;

/// Full application router.
pub fn app(state: AppState) -> Router {
    let web_dir = Path::new(&state.config.web_dir);
    let site = ServeDir::new(web_dir)
        .append_index_html_on_directories(true)
        .fallback(ServeFile::new(web_dir.join("index.html")));

    let pages = Router::new()
        .fallback_service(site)
        .layer(middleware::from_fn_with_state(state.clone(), pages::guard_pages));

    Router::new()
        .route("/api/auth/state", get(auth::auth_state))
        .route("/api/auth/session", get(auth::session_status))
        .route("/api/auth/google/login", post(auth::google_login))
        .route("/api/auth/google/register", post(auth::google_register))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/profile", get(profile::get_profile).patch(profile::update_profile))
        .route("/api/schedules", post(schedules::submit_schedule))
        .route("/healthz", get(healthz))
        .with_state(state)
        .merge(pages)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

// =============================================================================
// API ERRORS
// =============================================================================

/// JSON error body `{"error": message}` with a status code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "sign-in required")
    }

    fn internal(err: &StoreError) -> Self {
        tracing::error!(error = %err, "document store failure");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    }

    /// Map a sign-in failure, using the login page's wording.
    #[must_use]
    pub fn from_auth(err: &AuthError, mode: AuthMode) -> Self {
        let status = match err {
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::NotRegistered => StatusCode::NOT_FOUND,
            AuthError::AlreadyRegistered => StatusCode::CONFLICT,
            AuthError::Provider(ProviderError::Unavailable(_)) => StatusCode::BAD_GATEWAY,
            AuthError::Provider(_) => StatusCode::UNAUTHORIZED,
            AuthError::Store(e) => {
                tracing::error!(error = %e, "document store failure during sign-in");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.user_message(mode))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

impl From<ProfileError> for ApiError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::Validation(msg) => Self::new(StatusCode::BAD_REQUEST, msg),
            ProfileError::NotRegistered | ProfileError::Store(StoreError::NotFound { .. }) => {
                Self::new(StatusCode::NOT_FOUND, "profile not found")
            }
            ProfileError::AlreadyRegistered => Self::new(StatusCode::CONFLICT, "profile already exists"),
            ProfileError::Store(e) => Self::internal(&e),
        }
    }
}

impl From<ScheduleError> for ApiError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::Validation(msg) => Self::new(StatusCode::BAD_REQUEST, msg),
            ScheduleError::Store(e) => Self::internal(&e),
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
