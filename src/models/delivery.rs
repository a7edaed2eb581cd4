// src/models/delivery.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::user::User;

/// Lifecycle status of a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Scheduled,
    Ongoing,
    Finished,
    Paused,
    Stopped,
    #[serde(other)]
    Unknown,
}

/// Control action accepted by `POST /deliveries/{id}/control`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryAction {
    Start,
    Pause,
    Resume,
    Stop,
}

impl DeliveryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryAction::Start => "start",
            DeliveryAction::Pause => "pause",
            DeliveryAction::Resume => "resume",
            DeliveryAction::Stop => "stop",
        }
    }

    /// Status the delivery is expected to be in once the action succeeds.
    /// Used for the optimistic view update until the next fetch.
    pub fn resulting_status(&self) -> DeliveryStatus {
        match self {
            DeliveryAction::Start | DeliveryAction::Resume => DeliveryStatus::Ongoing,
            DeliveryAction::Pause => DeliveryStatus::Paused,
            DeliveryAction::Stop => DeliveryStatus::Stopped,
        }
    }
}

impl fmt::Display for DeliveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(DeliveryAction::Start),
            "pause" => Ok(DeliveryAction::Pause),
            "resume" => Ok(DeliveryAction::Resume),
            "stop" => Ok(DeliveryAction::Stop),
            other => Err(format!("Unknown delivery action '{}'", other)),
        }
    }
}

/// A scheduled instance of an exam for one group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    pub id: i64,
    pub exam_id: i64,
    pub group_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Duration in minutes.
    #[serde(default)]
    pub duration: u32,
    #[serde(default, alias = "last_status")]
    pub status: Option<DeliveryStatus>,
    #[serde(default)]
    pub exam_title: Option<String>,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub participant_count: u32,
    #[serde(default)]
    pub in_progress_count: u32,
    #[serde(default)]
    pub completed_count: u32,
}

/// Partial edit of a delivery. Absent fields are left untouched by the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDelivery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlRequest {
    pub action: DeliveryAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignUsersRequest {
    pub user_ids: Vec<i64>,
}

/// A committee member or scorer attached to a delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub user: User,
    pub assigned_at: DateTime<Utc>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryAssignments {
    #[serde(default)]
    pub committee: Vec<Assignment>,
    #[serde(default)]
    pub scorers: Vec<Assignment>,
}

/// Entry of `GET /my-deliveries`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryWithAssignments {
    pub delivery: Delivery,
    #[serde(default)]
    pub committee: Vec<Assignment>,
    #[serde(default)]
    pub scorers: Vec<Assignment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_status_is_tolerated() {
        let json = r#"{"id":1,"exam_id":2,"group_id":3,"last_status":"archived"}"#;
        let delivery: Delivery = serde_json::from_str(json).unwrap();
        assert_eq!(delivery.status, Some(DeliveryStatus::Unknown));
        assert_eq!(delivery.duration, 0);
    }

    #[test]
    fn test_action_tokens() {
        assert_eq!("pause".parse::<DeliveryAction>(), Ok(DeliveryAction::Pause));
        assert!("restart".parse::<DeliveryAction>().is_err());
        assert_eq!(DeliveryAction::Resume.resulting_status(), DeliveryStatus::Ongoing);
        assert_eq!(
            serde_json::to_string(&ControlRequest { action: DeliveryAction::Stop }).unwrap(),
            r#"{"action":"stop"}"#
        );
    }
}
