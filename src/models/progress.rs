// src/models/progress.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of one candidate's attempt, as computed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    NotStarted,
    InProgress,
    Completed,
    Abandoned,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantIdentity {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email: String,
    /// Registration number or test code.
    #[serde(default)]
    pub identifier: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptProgress {
    pub id: i64,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
    #[serde(default)]
    pub questions_answered: u32,
    #[serde(default)]
    pub total_questions: u32,
    pub status: AttemptStatus,
}

/// One row of the live progress table. Candidates who never opened the
/// exam have no attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantProgress {
    pub participant: ParticipantIdentity,
    #[serde(default)]
    pub attempt: Option<AttemptProgress>,
}

impl ParticipantProgress {
    pub fn status(&self) -> AttemptStatus {
        self.attempt
            .as_ref()
            .map(|a| a.status)
            .unwrap_or(AttemptStatus::NotStarted)
    }
}

/// Delivery header carried along with every progress snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliverySnapshot {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Free-form status string; the realtime service reports values such as
    /// 'completed', 'expired' or 'cancelled' that are not control states.
    #[serde(default)]
    pub status: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub participant_count: u32,
    #[serde(default)]
    pub in_progress_count: u32,
    #[serde(default)]
    pub completed_count: u32,
}

/// Full state of one delivery's participants at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub participants: Vec<ParticipantProgress>,
    #[serde(default)]
    pub delivery: Option<DeliverySnapshot>,
}

/// The backend emits `null` instead of `[]` for deliveries without candidates.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ParticipantProgress>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<ParticipantProgress>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_with_null_participants() {
        let snapshot: ProgressSnapshot =
            serde_json::from_str(r#"{"participants":null,"delivery":{"id":4,"name":"Mock"}}"#)
                .unwrap();
        assert!(snapshot.participants.is_empty());
        assert_eq!(snapshot.delivery.unwrap().id, 4);
    }

    #[test]
    fn test_missing_attempt_means_not_started() {
        let row: ParticipantProgress = serde_json::from_str(
            r#"{"participant":{"id":1,"name":"Ana","email":"","identifier":"R-1"}}"#,
        )
        .unwrap();
        assert_eq!(row.status(), AttemptStatus::NotStarted);
    }
}
