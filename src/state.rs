// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    api::ApiClient,
    config::Config,
    error::AppError,
    live::{Transport, TungsteniteTransport},
    session::SessionStore,
};

#[derive(Clone)]
pub struct AppState {
    pub api: ApiClient,
    pub sessions: SessionStore,
    pub config: Config,
    /// Used to open realtime feeds for the live progress view.
    pub transport: Arc<dyn Transport>,
}

impl AppState {
    /// State talking to the configured backend over real sockets.
    pub fn new(config: Config, sessions: SessionStore) -> Result<Self, AppError> {
        let api = ApiClient::new(&config.backend_url, config.request_timeout)?;
        Ok(Self {
            api,
            sessions,
            config,
            transport: Arc::new(TungsteniteTransport),
        })
    }
}

impl FromRef<AppState> for ApiClient {
    fn from_ref(state: &AppState) -> Self {
        state.api.clone()
    }
}

impl FromRef<AppState> for SessionStore {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
