// src/models/participant.rs

use serde::{Deserialize, Serialize};

/// A registered candidate ("test taker").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Registration number.
    #[serde(default)]
    pub reg: Option<String>,
    /// Test code handed out for code-based login.
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}
