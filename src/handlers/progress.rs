// src/handlers/progress.rs

use axum::{
    Extension, Json,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Serialize;

use crate::{
    error::AppError,
    live::{
        ChannelHandle, ChannelState, LiveChannel, ParticipantRow, ProgressSummary, ProgressView,
        RetryPolicy, realtime_url,
    },
    models::progress::DeliverySnapshot,
    session::Session,
    state::AppState,
};

/// The live progress page as sent to the browser.
#[derive(Debug, Serialize)]
pub struct ProgressPage {
    pub title: String,
    pub delivery_id: i64,
    pub state: ChannelState,
    pub connected: bool,
    pub loading: bool,
    pub error: Option<String>,
    pub delivery: Option<DeliverySnapshot>,
    pub delivery_active: bool,
    pub summary: ProgressSummary,
    pub participants: Vec<ParticipantRow>,
    pub last_updated: Option<chrono::DateTime<Utc>>,
}

impl From<&ProgressView> for ProgressPage {
    fn from(view: &ProgressView) -> Self {
        let now = Utc::now();
        Self {
            title: view.title(),
            delivery_id: view.delivery_id,
            state: view.state,
            connected: view.connected,
            loading: view.loading,
            error: view.error.clone(),
            delivery: view.delivery.clone(),
            delivery_active: view.is_delivery_active(now),
            summary: view.summary(),
            participants: view.rows(now),
            last_updated: view.last_updated,
        }
    }
}

/// One-shot snapshot of a delivery's progress. A failed fetch still renders
/// the page, with an empty list and the error banner.
pub async fn progress_snapshot(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let result = state.api.participant_progress(id, &session.session_id).await;
    let mut view = ProgressView::new(id);
    view.apply_initial(result, Utc::now());
    Json(ProgressPage::from(&view))
}

/// Opens the live feed for the lifetime of the browser socket.
pub async fn progress_socket(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    let url = realtime_url(state.api.base_url(), state.config.realtime_port, id)?;

    Ok(ws.on_upgrade(move |socket| async move {
        let handle = LiveChannel::spawn(
            state.transport.clone(),
            url,
            id,
            session.session_id.clone(),
            RetryPolicy::fixed(state.config.reconnect_delay),
        );
        // The first paint is relayed while the snapshot is still in flight
        {
            let relaying = relay(socket, &handle);
            tokio::pin!(relaying);
            tokio::select! {
                _ = &mut relaying => {}
                _ = handle.load_initial(&state.api, &session.session_id) => (&mut relaying).await,
            }
        }

        tracing::debug!("Progress view for delivery {} closed", id);
        handle.close().await;
    }))
}

/// Pushes every view change to the browser until it goes away.
async fn relay(mut socket: WebSocket, handle: &ChannelHandle) {
    let mut updates = handle.subscribe();
    updates.mark_changed();

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let page = ProgressPage::from(&*updates.borrow_and_update());
                let text = match serde_json::to_string(&page) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!("Failed to encode progress view: {}", e);
                        continue;
                    }
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }
}
