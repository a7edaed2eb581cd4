// src/handlers/profile.rs

use axum::{
    Extension, Json,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;

use crate::{error::AppError, session::Session, state::AppState, utils::gate::LOGIN_PATH};

/// Get the current user's profile, re-validated with the backend.
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Response, AppError> {
    let Some(refreshed) = state
        .sessions
        .refresh(&state.api, &session.session_id)
        .await?
    else {
        return Ok(Redirect::to(LOGIN_PATH).into_response());
    };

    let roles: Vec<&str> = refreshed.user.roles.iter().map(|r| r.name.as_str()).collect();

    Ok(Json(json!({
        "title": "Profile Settings",
        "user": refreshed.user,
        "roles": roles,
        "signed_in_at": refreshed.created_at,
    }))
    .into_response())
}
