//! Schedule routes: submit the weekly availability form.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use super::ApiError;
use super::auth::Browser;
use crate::services::schedule::{self, ScheduleForm};
use crate::state::AppState;

/// `POST /api/schedules`: 201 with the new submission's id.
pub async fn submit_schedule(
    State(state): State<AppState>,
    browser: Browser,
    Json(form): Json<ScheduleForm>,
) -> Response {
    let auth = browser.reconcile(&state).await;
    let Some(identity) = auth.identity else {
        return (browser.jar(), ApiError::unauthorized()).into_response();
    };

    let response = match schedule::submit(state.store.as_ref(), &identity, &form).await {
        Ok(id) => (StatusCode::CREATED, Json(json!({ "id": id }))).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    };
    (browser.jar(), response).into_response()
}

#[cfg(test)]
#[path = "schedules_test.rs"]
mod tests;
