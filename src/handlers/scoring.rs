// src/handlers/scoring.rs

use std::collections::BTreeMap;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::{
    api::ApiClient,
    error::AppError,
    handlers::ListView,
    listing::{ListConfig, ListQuery, SortOrder},
    models::attempt::{AttemptDetail, ScoreUpdate},
    scoring::{QuestionView, ScoringWorkbench},
    session::Session,
};

#[derive(Debug, Deserialize)]
pub struct WorkbenchParams {
    /// 1-based question number to open.
    pub question: Option<usize>,
}

/// Scores submitted from the workbench.
#[derive(Debug, Deserialize)]
pub struct ScoreSubmission {
    /// Points per question id. Questions left out keep their recorded score.
    #[serde(default)]
    pub overrides: BTreeMap<i64, f64>,
    pub penalty: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct QuestionEntry {
    pub id: i64,
    pub number: String,
    pub points: f64,
    pub effective_points: f64,
}

#[derive(Debug, Serialize)]
pub struct WorkbenchView {
    pub attempt: AttemptDetail,
    pub current: Option<QuestionView>,
    pub questions: Vec<QuestionEntry>,
    pub aggregate: f64,
    pub max_score: f64,
    pub has_changes: bool,
}

impl From<&ScoringWorkbench> for WorkbenchView {
    fn from(wb: &ScoringWorkbench) -> Self {
        let questions = wb
            .questions()
            .iter()
            .map(|q| QuestionEntry {
                id: q.id,
                number: q.number.clone(),
                points: q.points,
                effective_points: wb.points_for(q),
            })
            .collect();
        let mut attempt = wb.detail().clone();
        attempt.questions.clear();

        Self {
            attempt,
            current: wb.current(),
            questions,
            aggregate: wb.aggregate(),
            max_score: wb.questions().iter().map(|q| q.points).sum(),
            has_changes: wb.has_changes(),
        }
    }
}

/// Attempts of one delivery awaiting or holding scores.
pub async fn list_attempts(
    State(api): State<ApiClient>,
    Extension(session): Extension<Session>,
    Path(delivery_id): Path<i64>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let config = ListConfig::new("/attempts")
        .sort("started_at", SortOrder::Desc)
        .date_field("started_at");
    let query = ListQuery::from_params(&config, &params)?;
    let page = api
        .delivery_attempts(delivery_id, &query, &session.session_id)
        .await?;

    Ok(Json(ListView {
        title: "Scoring",
        query,
        page: page.into(),
    }))
}

/// Loads the attempt into a fresh workbench. Staged edits never outlive a request.
async fn load_workbench(
    api: &ApiClient,
    delivery_id: i64,
    attempt_id: i64,
    session: &Session,
) -> Result<ScoringWorkbench, AppError> {
    let detail = api.attempt_details(attempt_id, &session.session_id).await?;
    if detail
        .delivery
        .as_ref()
        .is_some_and(|d| d.id != 0 && d.id != delivery_id)
    {
        return Err(AppError::NotFound(format!(
            "Attempt {} does not belong to delivery {}",
            attempt_id, delivery_id
        )));
    }
    let answers = api.attempt_answers(attempt_id, &session.session_id).await?;
    Ok(ScoringWorkbench::new(detail, answers))
}

pub async fn workbench(
    State(api): State<ApiClient>,
    Extension(session): Extension<Session>,
    Path((delivery_id, attempt_id)): Path<(i64, i64)>,
    Query(params): Query<WorkbenchParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut wb = load_workbench(&api, delivery_id, attempt_id, &session).await?;
    if let Some(number) = params.question {
        wb.go_to(number.saturating_sub(1))?;
    }
    Ok(Json(WorkbenchView::from(&wb)))
}

/// Stages the submitted overrides, saves the aggregate and returns the
/// committed workbench.
pub async fn submit_score(
    State(api): State<ApiClient>,
    Extension(session): Extension<Session>,
    Path((delivery_id, attempt_id)): Path<(i64, i64)>,
    Json(payload): Json<ScoreSubmission>,
) -> Result<impl IntoResponse, AppError> {
    let mut wb = load_workbench(&api, delivery_id, attempt_id, &session).await?;
    for (question_id, points) in &payload.overrides {
        wb.stage(*question_id, *points)?;
    }
    if payload.penalty.is_some_and(|p| !p.is_finite() || p < 0.0) {
        return Err(AppError::BadRequest("Penalty must be a non-negative number".to_string()));
    }

    let total = wb.aggregate();
    let update = ScoreUpdate {
        score: total,
        penalty: payload.penalty,
    };
    api.update_score(attempt_id, &update, &session.session_id)
        .await?;
    wb.commit(total);

    tracing::info!(
        "Attempt {} scored {} by '{}' ({} override(s))",
        attempt_id,
        total,
        session.user.username,
        payload.overrides.len()
    );
    Ok(Json(WorkbenchView::from(&wb)))
}
