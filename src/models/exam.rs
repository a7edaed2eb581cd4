// src/models/exam.rs

use serde::{Deserialize, Serialize};

/// An exam (a "test" in the back-office navigation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exam {
    pub id: i64,
    #[serde(default)]
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_mcq: bool,
    #[serde(default)]
    pub is_interview: bool,
    #[serde(default)]
    pub is_random: bool,
    #[serde(default)]
    pub question_count: Option<u32>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}
