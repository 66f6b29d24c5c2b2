//! Session registry: admission, activity tracking, expiry sweeps.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::session::model::{Session, SessionMode};
use crate::{AppError, Result};

/// Point-in-time registry statistics, derived on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Sessions currently held in the registry.
    pub total_sessions: usize,
    /// Admission ceiling.
    pub max_sessions: usize,
    /// Count of sessions per mode name.
    pub sessions_by_mode: HashMap<String, usize>,
    /// Total prompts processed across all live sessions.
    pub total_messages: u64,
    /// Total tool invocations recorded across all live sessions.
    pub total_tool_calls: u64,
}

/// Registry of live sessions with capacity and inactivity enforcement.
///
/// Every accessor that touches a session bumps its `last_activity`;
/// expiry is checked lazily on access and eagerly by the sweep task.
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Session>>,
    max_sessions: usize,
    timeout: chrono::Duration,
}

impl SessionManager {
    /// Create a registry with the given admission ceiling and
    /// inactivity timeout.
    #[must_use]
    pub fn new(max_sessions: usize, timeout: chrono::Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
            timeout,
        }
    }

    /// Admit a new session.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Capacity` when the registry is full and
    /// `AppError::DuplicateSession` on the (vanishingly unlikely) id
    /// collision.
    pub async fn create(
        &self,
        working_directory: PathBuf,
        model: String,
        metadata: Value,
    ) -> Result<Session> {
        let mut sessions = self.sessions.write().await;
        if sessions.len() >= self.max_sessions {
            warn!(
                max_sessions = self.max_sessions,
                "session admission rejected: registry full"
            );
            return Err(AppError::Capacity(format!(
                "maximum session count ({}) reached",
                self.max_sessions
            )));
        }

        let session = Session::new(working_directory, model, metadata, Utc::now());
        if sessions.contains_key(&session.id) {
            return Err(AppError::DuplicateSession(session.id));
        }

        info!(session_id = %session.id, model = %session.model, "session created");
        sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    /// Fetch a session by id, bumping its activity stamp.
    ///
    /// A session found expired is removed and reported as such, so the
    /// caller sees `SessionExpired` exactly once and `SessionNotFound`
    /// afterwards.
    ///
    /// # Errors
    ///
    /// Returns `AppError::SessionNotFound` or `AppError::SessionExpired`.
    pub async fn get(&self, id: &str) -> Result<Session> {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(id) else {
            return Err(AppError::SessionNotFound(id.to_owned()));
        };

        let now = Utc::now();
        if session.is_expired(self.timeout, now) {
            sessions.remove(id);
            return Err(AppError::SessionExpired(id.to_owned()));
        }

        session.last_activity = now;
        Ok(session.clone())
    }

    /// Apply `mutate` to a live session, bumping its activity stamp.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`get`](SessionManager::get).
    pub async fn update<F>(&self, id: &str, mutate: F) -> Result<Session>
    where
        F: FnOnce(&mut Session),
    {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(id) else {
            return Err(AppError::SessionNotFound(id.to_owned()));
        };

        let now = Utc::now();
        if session.is_expired(self.timeout, now) {
            sessions.remove(id);
            return Err(AppError::SessionExpired(id.to_owned()));
        }

        session.last_activity = now;
        mutate(session);
        Ok(session.clone())
    }

    /// Switch a session's operating mode.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`get`](SessionManager::get).
    pub async fn set_mode(&self, id: &str, mode: SessionMode) -> Result<Session> {
        self.update(id, |s| s.mode = mode).await
    }

    /// Switch a session's model.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`get`](SessionManager::get).
    pub async fn set_model(&self, id: &str, model: String) -> Result<Session> {
        self.update(id, |s| s.model = model).await
    }

    /// Count one processed prompt against a session.
    ///
    /// Prompts additionally require the session to still be active;
    /// a cancelled session is reported as not found.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`get`](SessionManager::get), plus
    /// `AppError::SessionNotFound` for cancelled sessions.
    pub async fn record_prompt(&self, id: &str) -> Result<Session> {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(id) else {
            return Err(AppError::SessionNotFound(id.to_owned()));
        };

        let now = Utc::now();
        if session.is_expired(self.timeout, now) {
            sessions.remove(id);
            return Err(AppError::SessionExpired(id.to_owned()));
        }
        if !session.active {
            return Err(AppError::SessionNotFound(format!(
                "session '{id}' has been cancelled"
            )));
        }

        session.last_activity = now;
        session.message_count += 1;
        Ok(session.clone())
    }

    /// Count one tool invocation against a session.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`get`](SessionManager::get).
    pub async fn record_tool_call(&self, id: &str) -> Result<Session> {
        self.update(id, |s| s.tool_call_count += 1).await
    }

    /// Mark a session inactive; subsequent prompts are refused.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`get`](SessionManager::get).
    pub async fn deactivate(&self, id: &str) -> Result<Session> {
        self.update(id, |s| s.active = false).await
    }

    /// Remove a session outright; returns whether it existed.
    pub async fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            info!(session_id = %id, "session removed");
        }
        removed
    }

    /// Snapshot of all live sessions.
    pub async fn list(&self) -> Vec<Session> {
        self.sessions.read().await.values().cloned().collect()
    }

    /// Remove every session idle past the timeout as of `now`; returns
    /// the removed ids.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Vec<String> {
        let mut sessions = self.sessions.write().await;
        let expired: Vec<String> = sessions
            .values()
            .filter(|s| s.is_expired(self.timeout, now))
            .map(|s| s.id.clone())
            .collect();

        for id in &expired {
            sessions.remove(id);
        }

        if !expired.is_empty() {
            info!(count = expired.len(), "expired sessions swept");
        }
        expired
    }

    /// Derive registry statistics.
    pub async fn stats(&self) -> SessionStats {
        let sessions = self.sessions.read().await;
        let mut sessions_by_mode: HashMap<String, usize> = HashMap::new();
        let mut total_messages = 0;
        let mut total_tool_calls = 0;
        for session in sessions.values() {
            *sessions_by_mode
                .entry(session.mode.as_str().to_owned())
                .or_insert(0) += 1;
            total_messages += session.message_count;
            total_tool_calls += session.tool_call_count;
        }

        SessionStats {
            total_sessions: sessions.len(),
            max_sessions: self.max_sessions,
            sessions_by_mode,
            total_messages,
            total_tool_calls,
        }
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether the registry holds no sessions.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

/// Spawn the background expiry sweep loop.
///
/// Runs until `cancel` fires; each tick removes sessions idle past the
/// manager's timeout.
pub fn spawn_sweep_task(
    manager: Arc<SessionManager>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "session sweep task started");
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so a fresh registry
        // is not swept at startup.
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!("session sweep task stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let removed = manager.sweep_expired(Utc::now()).await;
                    debug!(removed = removed.len(), "session sweep tick");
                }
            }
        }
    })
}
