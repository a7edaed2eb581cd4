// src/handlers/dashboard.rs

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use serde_json::json;

use crate::{api::ApiClient, error::AppError, session::Session};

#[derive(Debug, Deserialize)]
pub struct DashboardParams {
    /// 'committee' or 'scorer'
    pub role: Option<String>,
}

pub async fn index() -> Redirect {
    Redirect::to("/back-office/dashboard")
}

/// Current user and the deliveries they are assigned to.
pub async fn dashboard(
    State(api): State<ApiClient>,
    Extension(session): Extension<Session>,
    Query(params): Query<DashboardParams>,
) -> Result<impl IntoResponse, AppError> {
    let role = params.role.as_deref().filter(|r| !r.is_empty());
    let deliveries = api.my_deliveries(role, &session.session_id).await?;

    Ok(Json(json!({
        "title": "Dashboard",
        "is_admin": session.user.has_role("administrator"),
        "user": session.user,
        "deliveries": deliveries,
    })))
}
