//! Guarded page serving.
//!
//! Runs in front of the static site. Asset requests pass straight through;
//! page requests are reconciled and judged by the route guard. A signed-in
//! visitor of `/login` is forwarded to where they were headed.

use axum::extract::{Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;

use super::ApiError;
use super::auth::Browser;
use crate::guard::{GuardDecision, LOGIN_PATH, is_asset, login_redirect_url, post_login_destination};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    from: Option<String>,
}

pub async fn guard_pages(
    State(state): State<AppState>,
    browser: Browser,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    if path.starts_with("/api/") {
        return ApiError::new(StatusCode::NOT_FOUND, "no such endpoint").into_response();
    }
    if is_asset(&path) {
        return next.run(request).await;
    }

    let target = request.uri().path_and_query().map_or(path.as_str(), |pq| pq.as_str()).to_owned();
    let auth = browser.reconcile(&state).await;
    let response = match state.guard.decide(&auth, &target) {
        GuardDecision::Allow if path == LOGIN_PATH && auth.identity.is_some() => {
            let query = Query::<LoginQuery>::try_from_uri(request.uri()).map(|Query(q)| q).unwrap_or_default();
            Redirect::to(post_login_destination(query.from.as_deref())).into_response()
        }
        GuardDecision::Allow => next.run(request).await,
        GuardDecision::Redirect { from, reason, .. } => {
            tracing::debug!(%from, reason = reason.as_str(), "redirecting to login");
            Redirect::to(&login_redirect_url(&from, reason)).into_response()
        }
        GuardDecision::Loading => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    };
    (browser.jar(), response).into_response()
}

#[cfg(test)]
#[path = "pages_test.rs"]
mod tests;
