//! Session management.
//!
//! One session per connected conversation. Each session owns its booking
//! engine, its message log, and a turn lock that serializes turns so two
//! messages from the same user cannot interleave tool execution.

mod error;
mod turn;

pub use error::SessionError;
pub use turn::{TurnController, TurnError, TurnOutcome, TurnOverrides};

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::info;
use ulid::Ulid;

use crate::booking::BookingEngine;
use crate::llm::Message;

pub const SESSION_ID_PREFIX: &str = "session_";

/// One live conversation.
pub struct SessionRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    /// Booking workflow state for this conversation.
    pub engine: Arc<BookingEngine>,
    /// Append-only conversation log.
    messages: Mutex<Vec<Message>>,
    /// Held for the duration of a turn; messages within a session serialize.
    pub turn_lock: Mutex<()>,
    last_activity: std::sync::RwLock<DateTime<Utc>>,
}

impl SessionRecord {
    /// Mark the session active now.
    pub fn touch(&self) {
        if let Ok(mut last) = self.last_activity.write() {
            *last = Utc::now();
        }
    }

    fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        let last = self
            .last_activity
            .read()
            .map(|l| *l)
            .unwrap_or(self.created_at);
        (now - last).to_std().unwrap_or(Duration::ZERO)
    }

    /// Whether the conversation log has been seeded yet.
    pub async fn is_empty(&self) -> bool {
        self.messages.lock().await.is_empty()
    }

    pub async fn append_messages(&self, batch: impl IntoIterator<Item = Message>) {
        self.messages.lock().await.extend(batch);
    }

    /// Clone of the full conversation log.
    pub async fn snapshot_messages(&self) -> Vec<Message> {
        self.messages.lock().await.clone()
    }
}

/// In-memory session store over a concurrent map.
///
/// Different sessions never contend; operations within one session go
/// through its own locks.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, Arc<SessionRecord>>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session around a fresh booking engine.
    pub fn create(&self, engine: Arc<BookingEngine>) -> Arc<SessionRecord> {
        let now = Utc::now();
        let record = Arc::new(SessionRecord {
            id: format!("{}{}", SESSION_ID_PREFIX, Ulid::new()),
            created_at: now,
            engine,
            messages: Mutex::new(Vec::new()),
            turn_lock: Mutex::new(()),
            last_activity: std::sync::RwLock::new(now),
        });

        self.sessions.insert(record.id.clone(), Arc::clone(&record));
        info!(session_id = %record.id, "Session created");
        record
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<SessionRecord>> {
        self.sessions.get(id).map(|r| Arc::clone(&r))
    }

    pub fn require(&self, id: &str) -> Result<Arc<SessionRecord>, SessionError> {
        self.get(id).ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    pub fn remove(&self, id: &str) -> Option<Arc<SessionRecord>> {
        let removed = self.sessions.remove(id).map(|(_, r)| r);
        if removed.is_some() {
            info!(session_id = %id, "Session removed");
        }
        removed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop sessions idle longer than `max_idle`. Returns how many went.
    pub fn sweep_idle(&self, max_idle: Duration) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, record| record.idle_for(now) < max_idle);
        let swept = before - self.sessions.len();
        if swept > 0 {
            info!(swept, remaining = self.sessions.len(), "Swept idle sessions");
        }
        swept
    }
}
