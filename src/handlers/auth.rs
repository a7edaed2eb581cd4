// src/handlers/auth.rs

use axum::{
    Form, Json,
    extract::{FromRequest, Request, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;

use crate::{
    error::AppError,
    models::user::LoginRequest,
    state::AppState,
    utils::gate::{self, LOGIN_PATH},
};

const DASHBOARD_PATH: &str = "/back-office/dashboard";

/// Public landing page.
pub async fn landing(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let signed_in = match gate::session_id(&headers, &state.config) {
        Some(id) => state.sessions.get(&id).await.is_some(),
        None => false,
    };

    Json(json!({
        "title": "Exam Management Console",
        "authenticated": signed_in,
        "links": {
            "login": LOGIN_PATH,
            "back_office": DASHBOARD_PATH,
        }
    }))
}

/// Describes the login form. Signed-in users go straight to the dashboard.
pub async fn login_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(id) = gate::session_id(&headers, &state.config) {
        if state.sessions.get(&id).await.is_some() {
            return Redirect::to(DASHBOARD_PATH).into_response();
        }
    }

    Json(json!({
        "title": "Sign in",
        "action": LOGIN_PATH,
        "method": "POST",
        "fields": [
            { "name": "username", "type": "text", "required": true },
            { "name": "password", "type": "password", "required": true },
        ]
    }))
    .into_response()
}

/// Authenticates against the backend and starts a console session.
///
/// Accepts JSON or a urlencoded form. JSON callers get the session back;
/// form posts are redirected to the dashboard. Both receive the cookie.
pub async fn login(State(state): State<AppState>, req: Request) -> Result<Response, AppError> {
    let previous = gate::session_id(req.headers(), &state.config);
    let is_form = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded"));

    let credentials = if is_form {
        Form::<LoginRequest>::from_request(req, &())
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
            .0
    } else {
        Json::<LoginRequest>::from_request(req, &())
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
            .0
    };

    let session = state
        .sessions
        .login(&state.api, &credentials, previous.as_deref())
        .await?;

    let cookie = gate::session_cookie(&state.config, &session.session_id).ok_or_else(|| {
        AppError::InternalServerError("Backend issued an unusable session id".to_string())
    })?;

    let mut response = if is_form {
        Redirect::to(DASHBOARD_PATH).into_response()
    } else {
        Json(json!({
            "success": true,
            "message": "Login successful",
            "user": session.user,
            "session_id": session.session_id,
        }))
        .into_response()
    };
    response.headers_mut().insert(header::SET_COOKIE, cookie);

    Ok(response)
}

/// Ends the session locally and at the backend, then clears the cookie.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(id) = gate::session_id(&headers, &state.config) {
        state.sessions.logout(&state.api, &id).await;
    }

    let mut response = (
        StatusCode::OK,
        Json(json!({ "success": true, "message": "Logged out" })),
    )
        .into_response();
    if let Some(cookie) = gate::expired_cookie(&state.config) {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}

/// Liveness of the console plus reachability of the backend.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.api.health().await {
        Ok(backend) => Json(json!({ "status": "ok", "backend": backend })),
        Err(e) => {
            tracing::warn!("Backend health check failed: {}", e);
            Json(json!({ "status": "degraded", "backend": { "error": e.banner() } }))
        }
    }
}
