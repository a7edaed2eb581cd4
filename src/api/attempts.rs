// src/api/attempts.rs

use super::ApiClient;
use crate::{
    error::AppError,
    models::attempt::{AttemptDetail, RecordedAnswer, ScoreUpdate},
};

impl ApiClient {
    pub async fn attempt_details(&self, id: i64, session: &str) -> Result<AttemptDetail, AppError> {
        self.get(&format!("/attempts/{}/details", id), Some(session))
            .await
    }

    /// Recorded answers of an attempt. `null` is treated as no answers.
    pub async fn attempt_answers(
        &self,
        id: i64,
        session: &str,
    ) -> Result<Vec<RecordedAnswer>, AppError> {
        let answers: Option<Vec<RecordedAnswer>> = self
            .get(&format!("/attempts/{}/answers", id), Some(session))
            .await?;
        Ok(answers.unwrap_or_default())
    }

    pub async fn update_score(
        &self,
        id: i64,
        update: &ScoreUpdate,
        session: &str,
    ) -> Result<serde_json::Value, AppError> {
        self.put(&format!("/attempts/{}/score", id), update, Some(session))
            .await
    }
}
