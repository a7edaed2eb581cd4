// src/live/protocol.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{error::AppError, models::progress::ProgressSnapshot};

/// Frames sent to the realtime service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// First frame after the socket opens.
    Auth { session_id: String },
}

/// Frames received from the realtime service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    AuthResponse {
        success: bool,
        #[serde(default)]
        delivery_id: Option<i64>,
        #[serde(default)]
        message: Option<String>,
    },
    ProgressUpdate {
        #[serde(default)]
        delivery_id: Option<i64>,
        data: ProgressSnapshot,
        timestamp: DateTime<Utc>,
    },
    Pong,
}

impl ClientMessage {
    pub fn to_json(&self) -> String {
        // A tagged enum of plain strings always serializes.
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl ServerMessage {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Realtime endpoint of a delivery: the backend host on the realtime port,
/// `wss` for an `https` backend and `ws` otherwise.
pub fn realtime_url(backend_url: &str, port: u16, delivery_id: i64) -> Result<Url, AppError> {
    let base = Url::parse(backend_url)
        .map_err(|e| AppError::InternalServerError(format!("Invalid backend URL: {}", e)))?;
    let host = base
        .host_str()
        .ok_or_else(|| AppError::InternalServerError("Backend URL has no host".to_string()))?;
    let scheme = if base.scheme() == "https" { "wss" } else { "ws" };

    let host = if host.contains(':') && !host.starts_with('[') {
        format!("[{}]", host)
    } else {
        host.to_string()
    };

    Url::parse(&format!(
        "{}://{}:{}/api/deliveries/{}/ws",
        scheme, host, port, delivery_id
    ))
    .map_err(|e| AppError::InternalServerError(format!("Invalid realtime URL: {}", e)))
}
