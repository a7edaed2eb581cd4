// src/handlers/delivery.rs

use std::collections::BTreeMap;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    api::{ApiClient, Resource},
    error::AppError,
    handlers::{ConfirmParams, list_view},
    models::delivery::{AssignUsersRequest, Delivery, DeliveryAction, UpdateDelivery},
    session::Session,
};

/// Body of the control endpoint. The action token is checked here so an
/// unknown token is a plain 400.
#[derive(Debug, Deserialize)]
pub struct ControlParams {
    pub action: String,
}

/// Lists deliveries, filtered by the query string.
pub async fn list_deliveries(
    State(api): State<ApiClient>,
    Extension(session): Extension<Session>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let view = list_view::<Delivery>(
        &api,
        Resource::Deliveries,
        "Delivery Management",
        &params,
        &session.session_id,
    )
    .await?;
    Ok(Json(view))
}

/// Schedules a new delivery.
pub async fn create_delivery(
    State(api): State<ApiClient>,
    Extension(session): Extension<Session>,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    for field in ["exam_id", "group_id", "name"] {
        if payload.get(field).is_none_or(Value::is_null) {
            return Err(AppError::BadRequest(format!("{} is required", field)));
        }
    }
    let created: Delivery = api
        .create(Resource::Deliveries, &payload, &session.session_id)
        .await?;
    tracing::info!("Delivery {} created by '{}'", created.id, session.user.username);
    Ok((StatusCode::CREATED, Json(created)))
}

/// Delivery detail with its committee and scorer assignments.
pub async fn get_delivery(
    State(api): State<ApiClient>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let delivery: Delivery = api.fetch(Resource::Deliveries, id, &session.session_id).await?;
    let assignments = match api.delivery_assignments(id, &session.session_id).await {
        Ok(assignments) => assignments,
        Err(e) => {
            tracing::warn!("Failed to load assignments for delivery {}: {}", id, e);
            Default::default()
        }
    };

    Ok(Json(json!({
        "delivery": delivery,
        "assignments": assignments,
    })))
}

pub async fn update_delivery(
    State(api): State<ApiClient>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateDelivery>,
) -> Result<impl IntoResponse, AppError> {
    let updated: Delivery = api
        .update(Resource::Deliveries, id, &payload, &session.session_id)
        .await?;
    tracing::info!("Delivery {} updated by '{}'", id, session.user.username);
    Ok(Json(updated))
}

pub async fn delete_delivery(
    State(api): State<ApiClient>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
    Query(confirm): Query<ConfirmParams>,
) -> Result<impl IntoResponse, AppError> {
    confirm.require("a delivery")?;
    api.remove(Resource::Deliveries, id, &session.session_id).await?;
    tracing::info!("Delivery {} deleted by '{}'", id, session.user.username);
    Ok(StatusCode::NO_CONTENT)
}

/// Starts, pauses, resumes or stops a delivery.
pub async fn control_delivery(
    State(api): State<ApiClient>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
    Json(payload): Json<ControlParams>,
) -> Result<impl IntoResponse, AppError> {
    let action: DeliveryAction = payload.action.trim().parse().map_err(AppError::BadRequest)?;
    let response = api
        .control_delivery(id, action, &session.session_id)
        .await?;
    tracing::info!("Delivery {} action '{}' by '{}'", id, action, session.user.username);

    Ok(Json(json!({
        "success": response.success,
        "message": response.message,
        "status": action.resulting_status(),
    })))
}

pub async fn list_assignments(
    State(api): State<ApiClient>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let assignments = api.delivery_assignments(id, &session.session_id).await?;
    Ok(Json(assignments))
}

pub async fn assign_committee(
    State(api): State<ApiClient>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
    Json(payload): Json<AssignUsersRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.user_ids.is_empty() {
        return Err(AppError::BadRequest("Select at least one user".to_string()));
    }
    let response = api
        .assign_committee(id, payload.user_ids, &session.session_id)
        .await?;
    Ok(Json(response))
}

pub async fn assign_scorers(
    State(api): State<ApiClient>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
    Json(payload): Json<AssignUsersRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.user_ids.is_empty() {
        return Err(AppError::BadRequest("Select at least one user".to_string()));
    }
    let response = api
        .assign_scorers(id, payload.user_ids, &session.session_id)
        .await?;
    Ok(Json(response))
}

/// Users eligible to be assigned as scorers.
pub async fn scorer_candidates(
    State(api): State<ApiClient>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, AppError> {
    let users = api.scorer_users(&session.session_id).await?;
    Ok(Json(users))
}
