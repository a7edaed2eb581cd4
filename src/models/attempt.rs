// src/models/attempt.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::question::QuestionType;

/// A question as presented in the scoring workbench.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringQuestion {
    pub id: i64,
    #[serde(default, alias = "question_number")]
    pub number: String,
    #[serde(default, alias = "question_text")]
    pub text: String,
    #[serde(default = "default_question_type", alias = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: Option<String>,
    /// Full credit for this question.
    pub points: f64,
}

fn default_question_type() -> QuestionType {
    QuestionType::MultipleChoice
}

/// A recorded candidate answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedAnswer {
    pub question_id: i64,
    #[serde(default)]
    pub answer: String,
    pub is_correct: Option<bool>,
    pub points_earned: Option<f64>,
    /// Per-question weight reported by the answers endpoint.
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptParticipant {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptDelivery {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Body of `GET /attempts/{id}/details`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptDetail {
    pub id: i64,
    pub participant: Option<AttemptParticipant>,
    pub delivery: Option<AttemptDelivery>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: String,
    #[serde(alias = "score")]
    pub total_score: Option<f64>,
    #[serde(default)]
    pub questions: Vec<ScoringQuestion>,
}

/// Row of `GET /deliveries/{id}/attempts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptSummary {
    pub id: i64,
    #[serde(default)]
    pub participant_name: String,
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub status: String,
    pub score: Option<f64>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// Body of `PUT /attempts/{id}/score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreUpdate {
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub penalty: Option<f64>,
}
