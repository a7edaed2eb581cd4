// src/utils/gate.rs

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Request, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    api::SESSION_HEADER, config::Config, session::SESSION_MAX_AGE_SECS, state::AppState,
};

/// Seconds the session cookie stays valid in the browser.
pub const SESSION_COOKIE_MAX_AGE: i64 = SESSION_MAX_AGE_SECS;

/// Where unauthenticated back-office requests are sent.
pub const LOGIN_PATH: &str = "/login";

/// Reads a cookie value from the `Cookie` request header.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

/// Session id presented by the caller: the session cookie, else the
/// `X-Session-ID` header.
pub fn session_id(headers: &HeaderMap, config: &Config) -> Option<String> {
    cookie_value(headers, &config.session_cookie)
        .or_else(|| headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok()))
        .map(str::to_string)
}

/// `Set-Cookie` value binding the browser to `session_id`.
pub fn session_cookie(config: &Config, session_id: &str) -> Option<HeaderValue> {
    let raw = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        config.session_cookie, session_id, SESSION_COOKIE_MAX_AGE
    );
    HeaderValue::from_str(&raw).ok()
}

/// `Set-Cookie` value that removes the session cookie.
pub fn expired_cookie(config: &Config) -> Option<HeaderValue> {
    let raw = format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", config.session_cookie);
    HeaderValue::from_str(&raw).ok()
}

/// Axum Middleware: back-office gate.
///
/// Requests without a known session are redirected to the login page.
/// Otherwise the `Session` is injected into the request extensions.
pub async fn gate_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let Some(id) = session_id(req.headers(), &state.config) else {
        tracing::debug!("No session on {}, redirecting to login", req.uri().path());
        return Redirect::to(LOGIN_PATH).into_response();
    };

    match state.sessions.get(&id).await {
        Some(session) => {
            req.extensions_mut().insert(session);
            next.run(req).await
        }
        None => {
            tracing::debug!("Unknown session on {}, redirecting to login", req.uri().path());
            Redirect::to(LOGIN_PATH).into_response()
        }
    }
}
