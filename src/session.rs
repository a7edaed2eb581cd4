// src/session.rs

//! Operator sessions.
//!
//! A `Session` is an immutable value; `login`, `refresh` and `logout` return
//! or remove whole values instead of mutating a shared user record. The
//! store is handed to handlers through `AppState` and mirrored to a JSON
//! file so a restart keeps operators signed in.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use validator::Validate;

use crate::{
    api::ApiClient,
    error::AppError,
    models::user::{LoginRequest, User},
};

/// Lifetime of a session, counted from login. Matches the cookie's Max-Age.
pub const SESSION_MAX_AGE_SECS: i64 = 86_400;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Backend session id, also used as the console cookie value.
    pub session_id: String,
    pub user: User,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at >= Duration::seconds(SESSION_MAX_AGE_SECS)
    }
}

/// On-disk layout of the session file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedSessions {
    version: u32,
    sessions: Vec<Session>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    path: Option<PathBuf>,
}

impl SessionStore {
    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens the store backed by `path`, re-hydrating any persisted sessions.
    /// An unreadable file is logged and replaced on the next write.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref().to_path_buf();
        let mut sessions = HashMap::new();

        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str::<PersistedSessions>(&raw) {
                Ok(persisted) => {
                    let now = Utc::now();
                    for session in persisted.sessions.into_iter().filter(|s| !s.is_expired(now)) {
                        sessions.insert(session.session_id.clone(), session);
                    }
                    tracing::info!("Restored {} session(s) from {}", sessions.len(), path.display());
                }
                Err(e) => {
                    tracing::warn!("Ignoring corrupt session file {}: {}", path.display(), e);
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        Ok(Self {
            sessions: Arc::new(RwLock::new(sessions)),
            path: Some(path),
        })
    }

    /// Looks up a live session. An expired one is evicted on the way.
    pub async fn get(&self, session_id: &str) -> Option<Session> {
        let session = self.sessions.read().await.get(session_id).cloned()?;
        if !session.is_expired(Utc::now()) {
            return Some(session);
        }

        let mut sessions = self.sessions.write().await;
        prune(&mut sessions);
        self.persist(&sessions).await;
        tracing::info!("Session for '{}' expired", session.user.username);
        None
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Authenticates against the backend and records the new session.
    ///
    /// Roles are merged from `/auth/me`; if that call fails the login user is
    /// kept as is. `replacing` is the session the browser held before, which
    /// is dropped so each browser context has at most one session.
    pub async fn login(
        &self,
        api: &ApiClient,
        credentials: &LoginRequest,
        replacing: Option<&str>,
    ) -> Result<Session, AppError> {
        credentials.validate()?;

        let response = api.login(credentials).await?;
        let session_id = response
            .session_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::AuthError("Login response carried no session".to_string()))?;
        let mut user = response
            .user
            .ok_or_else(|| AppError::AuthError("Login response carried no user".to_string()))?;

        match api.me(&session_id).await {
            Ok(me) => user = me.into_user(),
            Err(e) => tracing::warn!("Failed to fetch user roles: {}", e),
        }

        let session = Session {
            session_id: session_id.clone(),
            user,
            created_at: Utc::now(),
        };

        {
            let mut sessions = self.sessions.write().await;
            if let Some(previous) = replacing.filter(|p| *p != session_id) {
                sessions.remove(previous);
            }
            prune(&mut sessions);
            sessions.insert(session_id, session.clone());
            self.persist(&sessions).await;
        }

        tracing::info!("User '{}' logged in", session.user.username);
        Ok(session)
    }

    /// Ends the session. Local state is cleared even if the backend call fails.
    pub async fn logout(&self, api: &ApiClient, session_id: &str) {
        if let Err(e) = api.logout(session_id).await {
            tracing::warn!("Logout error: {}", e);
        }

        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.remove(session_id) {
            tracing::info!("User '{}' logged out", session.user.username);
            self.persist(&sessions).await;
        }
    }

    /// Re-validates a session with `/auth/me` and returns the refreshed value.
    ///
    /// A session the backend rejects (401 or 403) is removed and `Ok(None)`
    /// is returned. Any other failure, including a 5xx from the backend, is
    /// propagated and leaves the session in place.
    pub async fn refresh(
        &self,
        api: &ApiClient,
        session_id: &str,
    ) -> Result<Option<Session>, AppError> {
        let Some(current) = self.get(session_id).await else {
            return Ok(None);
        };

        match api.me(session_id).await {
            Ok(me) => {
                let refreshed = Session {
                    user: me.into_user(),
                    ..current
                };
                let mut sessions = self.sessions.write().await;
                sessions.insert(session_id.to_string(), refreshed.clone());
                self.persist(&sessions).await;
                Ok(Some(refreshed))
            }
            Err(AppError::AuthError(_)) | Err(AppError::Backend { status: 403, .. }) => {
                tracing::info!("Session for '{}' is no longer valid", current.user.username);
                let mut sessions = self.sessions.write().await;
                sessions.remove(session_id);
                self.persist(&sessions).await;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Writes the current sessions to disk. Failures are logged only; the
    /// in-memory store stays authoritative.
    async fn persist(&self, sessions: &HashMap<String, Session>) {
        let Some(path) = &self.path else {
            return;
        };

        let persisted = PersistedSessions {
            version: 0,
            sessions: sessions
                .values()
                .filter(|s| !s.is_expired(Utc::now()))
                .cloned()
                .collect(),
        };

        let result = async {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            let raw = serde_json::to_vec_pretty(&persisted)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            tokio::fs::write(path, raw).await
        }
        .await;

        if let Err(e) = result {
            tracing::error!("Failed to persist sessions to {}: {}", path.display(), e);
        }
    }
}

/// Drops every expired session from the map.
fn prune(sessions: &mut HashMap<String, Session>) {
    let now = Utc::now();
    sessions.retain(|_, s| !s.is_expired(now));
}
