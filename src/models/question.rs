// src/models/question.rs

use serde::{Deserialize, Serialize};

/// Question type as stored by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Simple,
    MultipleChoice,
    ShortAnswer,
    Essay,
    Interview,
    #[serde(other)]
    Unknown,
}

/// A single authored question (an "item").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    /// The question stem.
    #[serde(alias = "question_text")]
    pub text: String,

    #[serde(rename = "type", alias = "question_type")]
    pub question_type: QuestionType,

    /// Answer options for choice questions, empty otherwise.
    #[serde(default)]
    pub options: Vec<String>,

    /// Scoring weight.
    #[serde(default)]
    pub points: f64,

    /// Taxonomy tags (category ids).
    #[serde(default)]
    pub category_ids: Vec<i64>,
}

/// A titled set of questions, optionally sharing a vignette.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSet {
    pub id: i64,
    pub title: String,
    #[serde(rename = "type", default)]
    pub set_type: Option<String>,
    #[serde(default)]
    pub vignette: Option<String>,
    #[serde(default)]
    pub question_count: Option<u32>,
    #[serde(default)]
    pub questions: Vec<Question>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Taxonomy kind of a question category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryType {
    DiseaseGroup,
    RegionGroup,
    SpecificPart,
    TypicalGroup,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type", default = "unknown_category")]
    pub category_type: CategoryType,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub question_count: Option<u32>,
}

fn unknown_category() -> CategoryType {
    CategoryType::Unknown
}
