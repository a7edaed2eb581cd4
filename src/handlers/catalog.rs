// src/handlers/catalog.rs

//! Management pages that share the list / detail / delete shape:
//! exams, groups, categories, question sets, questions, test takers and users.

use std::collections::BTreeMap;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::{
    api::{ApiClient, Resource},
    error::AppError,
    handlers::{ConfirmParams, list_view},
    models::{
        exam::Exam,
        group::Group,
        participant::Participant,
        question::{Category, Question, QuestionSet},
        user::User,
    },
    session::Session,
};

/// Maps a back-office page segment to its backend resource and page title.
fn page(slug: &str) -> Result<(Resource, &'static str), AppError> {
    let page = match slug {
        "test" => (Resource::Exams, "Test Management"),
        "group" => (Resource::Groups, "Group Management"),
        "category" => (Resource::Categories, "Question Categories"),
        "question-set" => (Resource::QuestionSets, "Question Sets"),
        "question" | "question-pack" => (Resource::Questions, "Question Pack"),
        "test-taker" => (Resource::Participants, "Test Taker Management"),
        "user" => (Resource::Users, "User Access Control"),
        other => return Err(AppError::NotFound(format!("No page named '{}'", other))),
    };
    Ok(page)
}

pub async fn list_page(
    State(api): State<ApiClient>,
    Extension(session): Extension<Session>,
    Path(slug): Path<String>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Response, AppError> {
    let (resource, title) = page(&slug)?;
    let sid = session.session_id.as_str();

    let response = match resource {
        Resource::Exams => Json(list_view::<Exam>(&api, resource, title, &params, sid).await?).into_response(),
        Resource::Groups => Json(list_view::<Group>(&api, resource, title, &params, sid).await?).into_response(),
        Resource::Categories => {
            Json(list_view::<Category>(&api, resource, title, &params, sid).await?).into_response()
        }
        Resource::QuestionSets => {
            Json(list_view::<QuestionSet>(&api, resource, title, &params, sid).await?).into_response()
        }
        Resource::Questions => {
            Json(list_view::<Question>(&api, resource, title, &params, sid).await?).into_response()
        }
        Resource::Participants => {
            Json(list_view::<Participant>(&api, resource, title, &params, sid).await?).into_response()
        }
        Resource::Users => Json(list_view::<User>(&api, resource, title, &params, sid).await?).into_response(),
        Resource::Deliveries => {
            return Err(AppError::NotFound("Deliveries have their own page".to_string()));
        }
    };
    Ok(response)
}

pub async fn detail_page(
    State(api): State<ApiClient>,
    Extension(session): Extension<Session>,
    Path((slug, id)): Path<(String, i64)>,
) -> Result<Response, AppError> {
    let (resource, _) = page(&slug)?;
    let sid = session.session_id.as_str();

    let response = match resource {
        Resource::Exams => Json(api.fetch::<Exam>(resource, id, sid).await?).into_response(),
        Resource::Groups => Json(api.fetch::<Group>(resource, id, sid).await?).into_response(),
        Resource::Categories => Json(api.fetch::<Category>(resource, id, sid).await?).into_response(),
        Resource::QuestionSets => Json(api.fetch::<QuestionSet>(resource, id, sid).await?).into_response(),
        Resource::Questions => Json(api.fetch::<Question>(resource, id, sid).await?).into_response(),
        Resource::Participants => Json(api.fetch::<Participant>(resource, id, sid).await?).into_response(),
        Resource::Users => Json(api.fetch::<User>(resource, id, sid).await?).into_response(),
        Resource::Deliveries => {
            return Err(AppError::NotFound("Deliveries have their own page".to_string()));
        }
    };
    Ok(response)
}

/// Creates a record from the page's create dialog. The body is passed
/// through; the backend owns field validation.
pub async fn create_record(
    State(api): State<ApiClient>,
    Extension(session): Extension<Session>,
    Path(slug): Path<String>,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let (resource, _) = page(&slug)?;
    if !payload.is_object() {
        return Err(AppError::BadRequest("Expected a JSON object".to_string()));
    }

    let created: Value = api.create(resource, &payload, &session.session_id).await?;
    tracing::info!("{} created by '{}'", resource.label(), session.user.username);
    Ok((StatusCode::CREATED, Json(created)))
}

/// Deletes one record after explicit confirmation.
pub async fn delete_record(
    State(api): State<ApiClient>,
    Extension(session): Extension<Session>,
    Path((slug, id)): Path<(String, i64)>,
    Query(confirm): Query<ConfirmParams>,
) -> Result<impl IntoResponse, AppError> {
    let (resource, _) = page(&slug)?;
    confirm.require(&resource.label().to_lowercase())?;

    api.remove(resource, id, &session.session_id).await?;
    tracing::info!(
        "{} {} deleted by '{}'",
        resource.label(),
        id,
        session.user.username
    );
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_slugs() {
        assert_eq!(page("test-taker").unwrap().0, Resource::Participants);
        assert_eq!(page("question-set").unwrap().0, Resource::QuestionSets);
        assert!(matches!(page("nope"), Err(AppError::NotFound(_))));
    }
}
