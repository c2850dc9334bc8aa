// src/registry.rs

use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex, PoisonError},
    time::Duration,
};

use tokio::{
    sync::{Mutex, RwLock},
    task::JoinHandle,
    time::Instant,
};
use uuid::Uuid;

use crate::engine::SessionController;

/// How often the sweeper looks for finished sessions.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// One live session. The async mutex serializes every event handler
/// (intents, signals, ticks) so they never overlap.
pub struct SessionEntry {
    pub controller: Mutex<SessionController>,
    ticker: StdMutex<Option<JoinHandle<()>>>,
    /// When a sweep first saw the session in a terminal phase.
    finished_at: StdMutex<Option<Instant>>,
}

impl SessionEntry {
    fn new(controller: SessionController) -> Self {
        Self {
            controller: Mutex::new(controller),
            ticker: StdMutex::new(None),
            finished_at: StdMutex::new(None),
        }
    }

    /// How long the session has been finished, as of `now`. A session that is
    /// busy handling an intent is never considered finished.
    fn finished_for(&self, now: Instant) -> Option<Duration> {
        let controller = self.controller.try_lock().ok()?;
        if !controller.phase().is_terminal() {
            return None;
        }
        let mut stamp = self
            .finished_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Some(now - *stamp.get_or_insert(now))
    }

    /// Starts the once-per-period ticker if the session's timer is armed and
    /// no ticker is running yet.
    pub fn ensure_ticker(self: &Arc<Self>, controller: &SessionController, period: Duration) {
        if !controller.timer_running() {
            return;
        }
        let mut slot = self.ticker.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        let entry = Arc::clone(self);
        *slot = Some(tokio::spawn(run_ticker(entry, period)));
    }

    /// Aborts the ticker task, if any. Called whenever the session leaves
    /// `InProgress`; the controller has already disarmed its countdown.
    pub fn stop_ticker(&self) {
        let handle = self
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

async fn run_ticker(entry: Arc<SessionEntry>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    // The first tick completes immediately.
    interval.tick().await;

    loop {
        interval.tick().await;
        let mut session = entry.controller.lock().await;
        match session.tick().await {
            Ok(Some(_)) => {
                tracing::info!(session_id = %session.id(), "Session auto-submitted on expiry");
                break;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    session_id = %session.id(),
                    "Auto-submit on expiry failed, waiting for manual retry: {}",
                    e
                );
            }
        }
        if !session.timer_running() {
            break;
        }
    }
}

/// All sessions known to this process, keyed by session id.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, Arc<SessionEntry>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, controller: SessionController) -> Arc<SessionEntry> {
        let id = controller.id();
        let entry = Arc::new(SessionEntry::new(controller));
        self.sessions.write().await.insert(id, Arc::clone(&entry));
        entry
    }

    pub async fn get(&self, id: &Uuid) -> Option<Arc<SessionEntry>> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn remove(&self, id: &Uuid) -> Option<Arc<SessionEntry>> {
        let entry = self.sessions.write().await.remove(id);
        if let Some(entry) = &entry {
            entry.stop_ticker();
        }
        entry
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Discards sessions that have been completed or rejected for at least
    /// `retention`, so the final view stays readable for that long.
    /// Returns how many were dropped.
    pub async fn sweep(&self, retention: Duration) -> usize {
        let now = Instant::now();
        let expired: Vec<Uuid> = self
            .sessions
            .read()
            .await
            .iter()
            .filter(|(_, entry)| entry.finished_for(now).is_some_and(|d| d >= retention))
            .map(|(id, _)| *id)
            .collect();

        let mut sessions = self.sessions.write().await;
        for id in &expired {
            if let Some(entry) = sessions.remove(id) {
                entry.stop_ticker();
            }
        }
        expired.len()
    }

    /// Runs `sweep` every `period` for the life of the process.
    pub fn spawn_sweeper(&self, period: Duration, retention: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                if registry.is_empty().await {
                    continue;
                }
                let dropped = registry.sweep(retention).await;
                if dropped > 0 {
                    let remaining = registry.len().await;
                    tracing::info!(
                        dropped,
                        remaining,
                        "Discarded finished sessions"
                    );
                }
            }
        })
    }
}
