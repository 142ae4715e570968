use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use super::Conversation;
use crate::types::{AppError, AppResult};

const MAX_SWEEP_PERIOD: Duration = Duration::from_secs(60);
const MIN_SWEEP_PERIOD: Duration = Duration::from_secs(1);

struct Session {
    conversation: Arc<Mutex<Conversation>>,
    last_active: Instant,
}

impl Session {
    fn new() -> Self {
        Self {
            conversation: Arc::new(Mutex::new(Conversation::new())),
            last_active: Instant::now(),
        }
    }

    fn in_flight(&self) -> bool {
        self.conversation.try_lock().is_err()
    }
}

/// Session-scoped conversations.
///
/// Each session owns its own store behind a mutex; holding the guard is
/// what marks a model call as in flight for that session. Any access
/// refreshes the session's idle clock.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        let mut guard = self.inner.write().await;
        guard.insert(id, Session::new());
        id
    }

    pub async fn contains(&self, session_id: &Uuid) -> bool {
        self.inner.read().await.contains_key(session_id)
    }

    /// Lock a session for one turn. Fails with `Busy` instead of queueing
    /// when another turn is already running.
    pub async fn begin_turn(&self, session_id: &Uuid) -> AppResult<OwnedMutexGuard<Conversation>> {
        let conversation = self.get(session_id).await?;
        conversation.try_lock_owned().map_err(|_| {
            AppError::Busy(format!(
                "a request for session {} is already in progress",
                session_id
            ))
        })
    }

    /// Copy of the session's messages, waiting for any running turn to end.
    pub async fn snapshot(&self, session_id: &Uuid) -> AppResult<Conversation> {
        let conversation = self.get(session_id).await?;
        let guard = conversation.lock().await;
        Ok(guard.clone())
    }

    /// Discard a session's conversation. Returns whether it existed.
    pub async fn remove(&self, session_id: &Uuid) -> bool {
        self.inner.write().await.remove(session_id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Drop sessions untouched for longer than `idle`. Sessions with a turn
    /// in flight are kept. Returns how many were dropped.
    pub async fn expire_idle(&self, idle: Duration) -> usize {
        let mut guard = self.inner.write().await;
        let before = guard.len();
        guard.retain(|_, session| session.last_active.elapsed() < idle || session.in_flight());
        let expired = before - guard.len();

        if expired > 0 {
            info!(expired, remaining = guard.len(), "Expired idle sessions");
        }
        expired
    }

    /// Sweep idle sessions in the background for the life of the runtime.
    pub fn spawn_expiry(&self, idle: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        let period = (idle / 4).clamp(MIN_SWEEP_PERIOD, MAX_SWEEP_PERIOD);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            info!(idle_secs = idle.as_secs(), period_secs = period.as_secs(), "Session expiry started");

            loop {
                ticker.tick().await;
                debug!("Sweeping idle sessions");
                registry.expire_idle(idle).await;
            }
        })
    }

    async fn get(&self, session_id: &Uuid) -> AppResult<Arc<Mutex<Conversation>>> {
        let mut guard = self.inner.write().await;
        let session = guard
            .get_mut(session_id)
            .ok_or_else(|| AppError::NotFound(format!("session {}", session_id)))?;
        session.last_active = Instant::now();
        Ok(session.conversation.clone())
    }
}
