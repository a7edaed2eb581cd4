// src/live/channel.rs

//! Reconnecting realtime channel.
//!
//! ```text
//! Disconnected -> Connecting -> Authenticating -> Live
//!       ^                                          |
//!       +---- RetryPending <------ socket closed --+
//! ```
//!
//! The loop runs until the owning `ChannelHandle` is closed or dropped.
//! Dropping the handle cancels a pending retry and closes the socket.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use url::Url;

use super::{
    protocol::{ClientMessage, ServerMessage},
    transport::{Connection, Transport},
    view::ProgressView,
};
use crate::{api::ApiClient, error::AppError, models::progress::ProgressSnapshot};

const CONNECTION_ERROR: &str = "Connection error. Retrying...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Authenticating,
    Live,
    RetryPending,
}

/// When to reconnect after the socket closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Fixed delay before each reconnect attempt.
    pub delay: Duration,
    /// Consecutive failed connections tolerated; `None` retries forever.
    pub max_retries: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(3000),
            max_retries: None,
        }
    }
}

impl RetryPolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }
}

pub struct LiveChannel {
    transport: Arc<dyn Transport>,
    url: Url,
    session_id: String,
    policy: RetryPolicy,
    view: watch::Sender<ProgressView>,
    shutdown: oneshot::Receiver<()>,
}

/// Why a connection's read loop ended.
enum Exit {
    Shutdown,
    Disconnected,
}

impl LiveChannel {
    /// Starts the channel task for `delivery_id` and returns its handle.
    pub fn spawn(
        transport: Arc<dyn Transport>,
        url: Url,
        delivery_id: i64,
        session_id: String,
        policy: RetryPolicy,
    ) -> ChannelHandle {
        let (view_tx, view_rx) = watch::channel(ProgressView::new(delivery_id));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let channel = LiveChannel {
            transport,
            url,
            session_id,
            policy,
            view: view_tx.clone(),
            shutdown: shutdown_rx,
        };
        let task = tokio::spawn(channel.run());

        ChannelHandle {
            view_tx,
            view_rx,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }

    fn set_state(&self, state: ChannelState) {
        self.view.send_modify(|v| v.state = state);
    }

    async fn run(mut self) {
        let delivery_id = self.view.borrow().delivery_id;
        let mut failures: u32 = 0;

        loop {
            self.set_state(ChannelState::Connecting);
            tracing::info!("Connecting to realtime feed: {}", self.url);

            let connected = tokio::select! {
                _ = &mut self.shutdown => break,
                result = self.transport.connect(&self.url) => result,
            };

            match connected {
                Ok(mut conn) => {
                    failures = 0;
                    self.view.send_modify(|v| {
                        v.connected = true;
                        v.error = None;
                        v.state = ChannelState::Authenticating;
                    });

                    let exit = self.serve(conn.as_mut()).await;

                    self.view.send_modify(|v| v.connected = false);
                    if let Exit::Shutdown = exit {
                        conn.close().await;
                        break;
                    }
                    tracing::info!("Realtime feed for delivery {} disconnected", delivery_id);
                }
                Err(e) => {
                    failures += 1;
                    tracing::warn!("Realtime connection to {} failed: {}", self.url, e);
                    self.view.send_modify(|v| v.error = Some(CONNECTION_ERROR.to_string()));
                }
            }

            if self.policy.max_retries.is_some_and(|max| failures > max) {
                tracing::error!(
                    "Giving up on realtime feed for delivery {} after {} failures",
                    delivery_id,
                    failures
                );
                break;
            }

            self.set_state(ChannelState::RetryPending);
            tracing::info!("Attempting to reconnect in {:?}", self.policy.delay);

            tokio::select! {
                _ = &mut self.shutdown => break,
                _ = tokio::time::sleep(self.policy.delay) => {}
            }
        }

        self.view.send_modify(|v| {
            v.state = ChannelState::Disconnected;
            v.connected = false;
        });
        tracing::debug!("Realtime channel for delivery {} stopped", delivery_id);
    }

    /// Authenticates and reads frames until the socket closes or the
    /// handle asks to stop.
    async fn serve(&mut self, conn: &mut dyn Connection) -> Exit {
        let auth = ClientMessage::Auth {
            session_id: self.session_id.clone(),
        };
        if let Err(e) = conn.send(auth.to_json()).await {
            tracing::warn!("Failed to send auth frame: {}", e);
            self.view.send_modify(|v| v.error = Some(CONNECTION_ERROR.to_string()));
            return Exit::Disconnected;
        }

        loop {
            let frame = tokio::select! {
                _ = &mut self.shutdown => return Exit::Shutdown,
                frame = conn.next() => frame,
            };

            match frame {
                Some(Ok(text)) => self.handle_frame(&text),
                Some(Err(e)) => {
                    tracing::warn!("Realtime socket error: {}", e);
                    self.view.send_modify(|v| v.error = Some(CONNECTION_ERROR.to_string()));
                    return Exit::Disconnected;
                }
                None => return Exit::Disconnected,
            }
        }
    }

    fn handle_frame(&self, text: &str) {
        let message = match ServerMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Error parsing realtime message: {}", e);
                return;
            }
        };

        match message {
            ServerMessage::AuthResponse {
                success: true,
                delivery_id,
                ..
            } => {
                tracing::info!("Authentication successful for delivery: {:?}", delivery_id);
                self.set_state(ChannelState::Live);
            }
            // The socket stays open after a rejected auth; the error is only shown.
            ServerMessage::AuthResponse {
                success: false,
                message,
                ..
            } => {
                let message = message.unwrap_or_default();
                tracing::error!("Authentication failed: {}", message);
                self.view
                    .send_modify(|v| v.error = Some(format!("Authentication failed: {}", message)));
            }
            ServerMessage::ProgressUpdate {
                data, timestamp, ..
            } => {
                self.view.send_modify(|v| v.apply_update(data, timestamp));
            }
            ServerMessage::Pong => tracing::debug!("Received pong from server"),
        }
    }
}

/// Owner of a running channel. The channel lives exactly as long as this handle.
pub struct ChannelHandle {
    view_tx: watch::Sender<ProgressView>,
    view_rx: watch::Receiver<ProgressView>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ChannelHandle {
    /// Current view.
    pub fn view(&self) -> ProgressView {
        self.view_rx.borrow().clone()
    }

    pub fn state(&self) -> ChannelState {
        self.view_rx.borrow().state
    }

    /// Receiver notified on every view change.
    pub fn subscribe(&self) -> watch::Receiver<ProgressView> {
        self.view_rx.clone()
    }

    /// Feeds the result of the initial REST snapshot into the view.
    pub fn apply_initial(&self, result: Result<ProgressSnapshot, AppError>) {
        self.view_tx
            .send_modify(|v| v.apply_initial(result, Utc::now()));
    }

    /// Fetches the one-shot snapshot for the first paint and applies it.
    pub async fn load_initial(&self, api: &ApiClient, session_id: &str) {
        let delivery_id = self.view_rx.borrow().delivery_id;
        let result = api.participant_progress(delivery_id, session_id).await;
        self.apply_initial(result);
    }

    /// Stops the channel and waits for the socket to be closed.
    pub async fn close(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("Realtime channel task failed: {}", e);
            }
        }
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    /// Scripted transport: each connect pops a script of server frames;
    /// `None` in a script closes the socket.
    struct ScriptedTransport {
        connects: AtomicUsize,
        scripts: Mutex<Vec<Vec<Option<String>>>>,
        sent: mpsc::UnboundedSender<String>,
    }

    struct ScriptedConnection {
        frames: std::vec::IntoIter<Option<String>>,
        sent: mpsc::UnboundedSender<String>,
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn connect(&self, _url: &Url) -> Result<Box<dyn Connection>, AppError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            let script = {
                let mut scripts = self.scripts.lock().unwrap();
                if scripts.is_empty() {
                    return Err(AppError::Transport("connection refused".into()));
                }
                scripts.remove(0)
            };
            Ok(Box::new(ScriptedConnection {
                frames: script.into_iter(),
                sent: self.sent.clone(),
            }))
        }
    }

    #[async_trait]
    impl Connection for ScriptedConnection {
        async fn send(&mut self, text: String) -> Result<(), AppError> {
            let _ = self.sent.send(text);
            Ok(())
        }

        async fn next(&mut self) -> Option<Result<String, AppError>> {
            match self.frames.next() {
                Some(Some(frame)) => Some(Ok(frame)),
                Some(None) => None,
                // Script exhausted: stay open.
                None => std::future::pending().await,
            }
        }

        async fn close(&mut self) {}
    }

    fn transport(
        scripts: Vec<Vec<Option<String>>>,
    ) -> (Arc<ScriptedTransport>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Arc::new(ScriptedTransport {
            connects: AtomicUsize::new(0),
            scripts: Mutex::new(scripts),
            sent: tx,
        });
        (transport, rx)
    }

    fn url() -> Url {
        Url::parse("ws://127.0.0.1:8080/api/deliveries/3/ws").unwrap()
    }

    fn update(ids: &[i64]) -> String {
        let participants: Vec<serde_json::Value> = ids
            .iter()
            .map(|id| serde_json::json!({"participant": {"id": id, "name": format!("P{}", id)}}))
            .collect();
        serde_json::json!({
            "type": "progress_update",
            "delivery_id": 3,
            "data": {"participants": participants, "delivery": {"id": 3, "name": "Batch"}},
            "timestamp": "2024-05-01T08:00:00Z"
        })
        .to_string()
    }

    /// Lets spawned tasks run without advancing the paused clock.
    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_authenticates_then_goes_live() {
        let (transport, mut sent) = transport(vec![vec![Some(
            r#"{"type":"auth_response","success":true,"delivery_id":3}"#.into(),
        )]]);
        let handle = LiveChannel::spawn(transport, url(), 3, "sess-1".into(), RetryPolicy::default());
        settle().await;

        assert_eq!(sent.recv().await.unwrap(), r#"{"type":"auth","session_id":"sess-1"}"#);
        assert_eq!(handle.state(), ChannelState::Live);
        assert!(handle.view().connected);
        handle.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnects_once_after_fixed_delay() {
        let (transport, _sent) = transport(vec![vec![None], vec![]]);
        let handle = LiveChannel::spawn(
            transport.clone(),
            url(),
            3,
            "sess-1".into(),
            RetryPolicy::default(),
        );
        settle().await;
        assert_eq!(transport.connects.load(Ordering::SeqCst), 1);
        assert_eq!(handle.state(), ChannelState::RetryPending);

        tokio::time::advance(Duration::from_millis(2999)).await;
        settle().await;
        assert_eq!(transport.connects.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(transport.connects.load(Ordering::SeqCst), 2);
        assert_eq!(handle.state(), ChannelState::Authenticating);
        handle.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_keeps_retrying_while_unreachable() {
        let (transport, _sent) = transport(vec![]);
        let handle = LiveChannel::spawn(
            transport.clone(),
            url(),
            3,
            "sess-1".into(),
            RetryPolicy::default(),
        );
        settle().await;

        for expected in 2..=6 {
            tokio::time::advance(Duration::from_millis(3000)).await;
            settle().await;
            assert_eq!(transport.connects.load(Ordering::SeqCst), expected);
        }
        assert_eq!(handle.view().error.as_deref(), Some(CONNECTION_ERROR));
        handle.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_retry() {
        let (transport, _sent) = transport(vec![vec![None]]);
        let handle = LiveChannel::spawn(
            transport.clone(),
            url(),
            3,
            "sess-1".into(),
            RetryPolicy::default(),
        );
        settle().await;
        assert_eq!(handle.state(), ChannelState::RetryPending);

        drop(handle);
        settle().await;
        tokio::time::advance(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(transport.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_update_replaces_participants() {
        let (transport, _sent) = transport(vec![vec![
            Some(r#"{"type":"auth_response","success":true,"delivery_id":3}"#.into()),
            Some(update(&[1, 2, 3])),
            Some(r#"{"type":"pong"}"#.into()),
            Some("not json".into()),
            Some(update(&[4])),
        ]]);
        let handle = LiveChannel::spawn(transport, url(), 3, "sess-1".into(), RetryPolicy::default());
        settle().await;

        let view = handle.view();
        let ids: Vec<i64> = view.participants.iter().map(|p| p.participant.id).collect();
        assert_eq!(ids, vec![4]);
        assert_eq!(view.live_updates, 2);
        handle.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_failure_keeps_socket_open() {
        let (transport, _sent) = transport(vec![vec![
            Some(r#"{"type":"auth_response","success":false,"message":"Invalid session"}"#.into()),
            Some(update(&[9])),
        ]]);
        let handle = LiveChannel::spawn(transport.clone(), url(), 3, "bad".into(), RetryPolicy::default());
        settle().await;

        let view = handle.view();
        assert_eq!(view.error.as_deref(), Some("Authentication failed: Invalid session"));
        assert_eq!(view.state, ChannelState::Authenticating);
        assert_eq!(view.participants.len(), 1);
        assert_eq!(transport.connects.load(Ordering::SeqCst), 1);
        handle.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_policy_gives_up() {
        let (transport, _sent) = transport(vec![]);
        let policy = RetryPolicy {
            delay: Duration::from_millis(100),
            max_retries: Some(2),
        };
        let handle = LiveChannel::spawn(transport.clone(), url(), 3, "sess-1".into(), policy);
        for _ in 0..5 {
            settle().await;
            tokio::time::advance(Duration::from_millis(100)).await;
        }
        settle().await;
        assert_eq!(transport.connects.load(Ordering::SeqCst), 3);
        assert_eq!(handle.state(), ChannelState::Disconnected);
    }
}
