//! Profile routes: read and edit the signed-in user's own profile.

use axum::extract::State;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use super::ApiError;
use super::auth::Browser;
use crate::services::profile::{ProfileError, ProfileUpdate};
use crate::state::AppState;

/// Fields a user may change on their own profile. Role flags and the
/// account email are not editable here; unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileEdit {
    name: Option<String>,
    year: Option<i32>,
}

impl From<ProfileEdit> for ProfileUpdate {
    fn from(edit: ProfileEdit) -> Self {
        Self { name: edit.name, year: edit.year, ..Self::default() }
    }
}

/// `GET /api/profile`
pub async fn get_profile(State(state): State<AppState>, browser: Browser) -> Response {
    let auth = browser.reconcile(&state).await;
    let response = match (auth.identity, auth.profile) {
        (None, _) => ApiError::unauthorized().into_response(),
        (Some(_), None) => ApiError::from(ProfileError::NotRegistered).into_response(),
        (Some(_), Some(profile)) => Json(profile).into_response(),
    };
    (browser.jar(), response).into_response()
}

/// `PATCH /api/profile`: apply the edit, then answer with the refreshed profile.
pub async fn update_profile(
    State(state): State<AppState>,
    browser: Browser,
    Json(edit): Json<ProfileEdit>,
) -> Response {
    let controller = browser.controller(&state);
    let auth = controller.resolved().await;
    let Some(identity) = auth.identity else {
        return (browser.jar(), ApiError::unauthorized()).into_response();
    };

    if let Err(e) = state.profiles().update_profile(&identity.uid, edit.into()).await {
        return (browser.jar(), ApiError::from(e)).into_response();
    }
    controller.refresh_profile().await;
    (browser.jar(), Json(controller.snapshot().profile)).into_response()
}

#[cfg(test)]
#[path = "profile_test.rs"]
mod tests;
