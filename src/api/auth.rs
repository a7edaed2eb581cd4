// src/api/auth.rs

use super::ApiClient;
use crate::{
    error::AppError,
    models::user::{LoginRequest, LoginResponse, MeResponse},
};

impl ApiClient {
    /// `POST /auth/login`. A rejected login is reported by the backend as
    /// `success = false` with status 200; it is surfaced here as `AuthError`.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<LoginResponse, AppError> {
        let response: LoginResponse = self.post("/auth/login", Some(credentials), None).await?;
        if !response.success {
            let message = if response.message.is_empty() {
                "Login failed".to_string()
            } else {
                response.message
            };
            return Err(AppError::AuthError(message));
        }
        Ok(response)
    }

    pub async fn logout(&self, session: &str) -> Result<(), AppError> {
        self.post::<serde_json::Value, ()>("/auth/logout", None, Some(session))
            .await?;
        Ok(())
    }

    /// `GET /auth/me`: the current user plus session data holding the roles.
    pub async fn me(&self, session: &str) -> Result<MeResponse, AppError> {
        self.get("/auth/me", Some(session)).await
    }
}
