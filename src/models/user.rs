// src/models/user.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// A role granted to a back-office user (e.g. 'administrator', 'committee', 'scorer').
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A back-office user as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique login name.
    pub username: String,

    #[serde(default)]
    pub email: String,

    /// Display name.
    #[serde(default)]
    pub name: String,

    /// Roles are only present once merged from `/auth/me` session data.
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl User {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.name == role)
    }
}

/// Credentials posted to the login endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50, message = "Username is required."))]
    pub username: String,
    #[validate(length(min = 1, max = 128, message = "Password is required."))]
    pub password: String,
}

/// Body of `POST /api/auth/login`. A failed login still answers 200 with `success = false`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub user: Option<User>,
    pub session_id: Option<String>,
}

/// Session data attached by the backend auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub user_id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub roles: Vec<Role>,
}

/// Body of `GET /api/auth/me`.
#[derive(Debug, Clone, Deserialize)]
pub struct MeResponse {
    pub user: User,
    pub session_data: Option<SessionData>,
}

impl MeResponse {
    /// The user with roles taken from the session data when present.
    pub fn into_user(self) -> User {
        let mut user = self.user;
        if let Some(data) = self.session_data {
            user.roles = data.roles;
        }
        user
    }
}
