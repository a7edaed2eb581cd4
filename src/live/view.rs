// src/live/view.rs

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::channel::ChannelState;
use crate::{
    error::AppError,
    models::progress::{AttemptStatus, DeliverySnapshot, ParticipantIdentity, ParticipantProgress, ProgressSnapshot},
};

/// A participant counts as online when active within this window.
const ONLINE_WINDOW_SECS: i64 = 120;

/// Delivery statuses after which no attempt can still be running.
const CLOSED_DELIVERY_STATUSES: &[&str] = &["completed", "expired", "cancelled"];

/// What the live progress page shows. The participant list is always the
/// latest snapshot as a whole.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressView {
    pub delivery_id: i64,
    pub state: ChannelState,
    pub connected: bool,
    /// True until the initial snapshot request has finished.
    pub loading: bool,
    pub error: Option<String>,
    pub participants: Vec<ParticipantProgress>,
    pub delivery: Option<DeliverySnapshot>,
    pub last_updated: Option<DateTime<Utc>>,
    /// Number of pushed updates applied so far.
    pub live_updates: u64,
}

impl ProgressView {
    pub fn new(delivery_id: i64) -> Self {
        Self {
            delivery_id,
            state: ChannelState::Disconnected,
            connected: false,
            loading: true,
            error: None,
            participants: Vec::new(),
            delivery: None,
            last_updated: None,
            live_updates: 0,
        }
    }

    /// Replaces participants and delivery with a pushed snapshot.
    /// No merging and no ordering check: the last message wins.
    pub fn apply_update(&mut self, snapshot: ProgressSnapshot, timestamp: DateTime<Utc>) {
        self.participants = snapshot.participants;
        self.delivery = snapshot.delivery;
        self.last_updated = Some(timestamp);
        self.live_updates += 1;
    }

    /// Applies the result of the one-shot REST fetch made on mount.
    ///
    /// A failure leaves an empty participant list and a banner so the page
    /// still renders. A snapshot that loses the race against a pushed
    /// update is dropped.
    pub fn apply_initial(&mut self, result: Result<ProgressSnapshot, AppError>, now: DateTime<Utc>) {
        self.loading = false;
        match result {
            Ok(snapshot) => {
                if self.live_updates > 0 {
                    tracing::debug!(
                        "Delivery {}: initial snapshot arrived after a live update, ignoring",
                        self.delivery_id
                    );
                    return;
                }
                self.participants = snapshot.participants;
                self.delivery = snapshot.delivery;
                self.last_updated = Some(now);
            }
            Err(e) => {
                tracing::warn!("Delivery {}: failed to load progress: {}", self.delivery_id, e);
                self.error = Some(e.banner());
                if self.live_updates == 0 {
                    self.participants.clear();
                }
            }
        }
    }

    pub fn summary(&self) -> ProgressSummary {
        let mut summary = ProgressSummary {
            total: self.participants.len(),
            ..ProgressSummary::default()
        };
        for row in &self.participants {
            match row.status() {
                AttemptStatus::NotStarted => summary.not_started += 1,
                AttemptStatus::InProgress => summary.in_progress += 1,
                AttemptStatus::Completed => summary.completed += 1,
                AttemptStatus::Abandoned => summary.abandoned += 1,
            }
        }
        summary
    }

    /// Whether attempts of this delivery may still be running at `now`.
    /// Without delivery information the delivery is assumed active.
    pub fn is_delivery_active(&self, now: DateTime<Utc>) -> bool {
        let Some(delivery) = &self.delivery else {
            return true;
        };
        if delivery.start_date.is_some_and(|start| now < start) {
            return false;
        }
        if delivery.end_date.is_some_and(|end| now > end) {
            return false;
        }
        !delivery
            .status
            .as_deref()
            .is_some_and(|s| CLOSED_DELIVERY_STATUSES.contains(&s))
    }

    /// Per-participant derived metrics as of `now`.
    pub fn rows(&self, now: DateTime<Utc>) -> Vec<ParticipantRow> {
        let active = self.is_delivery_active(now);
        self.participants
            .iter()
            .map(|p| ParticipantRow::derive(p, active, now))
            .collect()
    }

    pub fn title(&self) -> String {
        match &self.delivery {
            Some(d) => format!(
                "Live Progress: {}",
                d.display_name.as_deref().filter(|n| !n.is_empty()).unwrap_or(&d.name)
            ),
            None => "Live Participant Progress".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressSummary {
    pub total: usize,
    pub not_started: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub abandoned: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantRow {
    pub participant: ParticipantIdentity,
    /// Status as displayed: a running attempt of a closed delivery shows as abandoned.
    pub status: AttemptStatus,
    pub questions_answered: u32,
    pub total_questions: u32,
    pub completion_percent: u32,
    pub elapsed_seconds: Option<i64>,
    pub elapsed_label: String,
    pub online: bool,
}

impl ParticipantRow {
    fn derive(row: &ParticipantProgress, delivery_active: bool, now: DateTime<Utc>) -> Self {
        let mut status = row.status();
        if !delivery_active && status == AttemptStatus::InProgress {
            status = AttemptStatus::Abandoned;
        }

        let attempt = row.attempt.as_ref();
        let answered = attempt.map(|a| a.questions_answered).unwrap_or(0);
        let total = attempt.map(|a| a.total_questions).unwrap_or(0);
        let elapsed = attempt
            .and_then(|a| a.started_at.map(|start| elapsed_between(start, a.ended_at, now)));

        Self {
            participant: row.participant.clone(),
            status,
            questions_answered: answered,
            total_questions: total,
            completion_percent: completion_percent(answered, total),
            elapsed_seconds: elapsed.map(|d| d.num_seconds()),
            elapsed_label: elapsed.map(format_elapsed).unwrap_or_else(|| "Not started".to_string()),
            online: attempt
                .and_then(|a| a.last_activity)
                .is_some_and(|last| (now - last).num_seconds() < ONLINE_WINDOW_SECS),
        }
    }
}

/// Time spent on an attempt: up to its end when finished, else up to `now`.
pub fn elapsed_between(start: DateTime<Utc>, end: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Duration {
    end.unwrap_or(now) - start
}

/// `answered / total` as a rounded percentage; 0 when there are no questions.
pub fn completion_percent(answered: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    ((answered as f64 / total as f64) * 100.0).round() as u32
}

pub fn format_elapsed(elapsed: Duration) -> String {
    let minutes = elapsed.num_minutes().max(0);
    let hours = minutes / 60;
    let mins = minutes % 60;
    if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else {
        format!("{} minutes", mins)
    }
}
