//! Session store: bounded history windows plus conversational pointers.
//!
//! Optionally persists all sessions in one JSON file, loaded on boot and
//! rewritten after every committed turn. A turn's session mutations
//! (history appends, active-entity pointer, pending-proposal pointer)
//! arrive together as a [`TurnCommit`] and are applied in a single
//! write-lock section, so a failed turn leaves no partial state behind.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ca_domain::error::{Error, Result};
use ca_domain::trace::TraceEvent;
use ca_domain::types::{EmployeeId, Exchange, Role};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One conversation's rolling state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    /// Most recent exchanges, oldest first. Never exceeds the store's
    /// window size after a commit.
    #[serde(default)]
    pub history: VecDeque<Exchange>,
    /// Weak reference: the employee may be deleted after this is set.
    #[serde(default)]
    pub active_entity: Option<EmployeeId>,
    /// At most one proposal awaits confirmation per session.
    #[serde(default)]
    pub pending_proposal: Option<Uuid>,
    #[serde(default)]
    pub turns: u64,
}

impl Session {
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            created_at: now,
            last_active: now,
            history: VecDeque::new(),
            active_entity: None,
            pending_proposal: None,
            turns: 0,
        }
    }

    pub fn has_active_entity(&self) -> bool {
        self.active_entity.is_some()
    }

    pub fn idle_minutes(&self, now: DateTime<Utc>) -> i64 {
        now.signed_duration_since(self.last_active).num_minutes()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Turn commit
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Three-way pointer update: leave as-is, point somewhere, or unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Update<T> {
    #[default]
    Keep,
    Set(T),
    Clear,
}

impl<T> Update<T> {
    fn apply(self, slot: &mut Option<T>) {
        match self {
            Update::Keep => {}
            Update::Set(value) => *slot = Some(value),
            Update::Clear => *slot = None,
        }
    }
}

/// Everything one turn wants to change about its session, applied
/// atomically by [`SessionStore::commit`]. A cancelled or failed turn
/// simply never builds one.
#[derive(Debug, Clone, Default)]
pub struct TurnCommit {
    pub appends: Vec<Exchange>,
    pub active_entity: Update<EmployeeId>,
    pub pending_proposal: Update<Uuid>,
}

impl TurnCommit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(mut self, text: impl Into<String>) -> Self {
        self.appends.push(Exchange::now(Role::User, text));
        self
    }

    pub fn assistant(mut self, text: impl Into<String>) -> Self {
        self.appends.push(Exchange::now(Role::Assistant, text));
        self
    }

    pub fn activate(mut self, id: EmployeeId) -> Self {
        self.active_entity = Update::Set(id);
        self
    }

    pub fn deactivate(mut self) -> Self {
        self.active_entity = Update::Clear;
        self
    }

    pub fn pending(mut self, id: Uuid) -> Self {
        self.pending_proposal = Update::Set(id);
        self
    }

    pub fn clear_pending(mut self) -> Self {
        self.pending_proposal = Update::Clear;
        self
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Store trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Session storage seam, so the in-memory map can be swapped for a
/// shared backend without touching the pipeline.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str) -> Option<Session>;

    async fn put(&self, session: Session) -> Result<()>;

    /// Drop a session. Returns whether it existed.
    async fn evict(&self, session_id: &str) -> bool;

    /// Fetch the session, creating it when the id is unknown or absent.
    /// Returns `(session, is_new)`.
    async fn resolve_or_create(&self, session_id: Option<&str>) -> (Session, bool);

    /// Apply one turn's state changes in a single atomic step.
    async fn commit(&self, session_id: &str, turn: TurnCommit) -> Result<()>;

    /// Evict every session idle for at least `idle_minutes`. Returns the
    /// eviction count.
    async fn sweep_idle(&self, idle_minutes: u32) -> usize;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// In-memory store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Reference [`SessionStore`] backed by a `RwLock<HashMap>`, optionally
/// persisted as one JSON file.
pub struct MemorySessionStore {
    window: usize,
    persist_path: Option<PathBuf>,
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            persist_path: None,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Load or create a persisted store at `path`.
    pub fn with_persistence(window: usize, path: &Path) -> Result<Self> {
        let sessions: HashMap<String, Session> = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(Error::Io)?;
            match serde_json::from_str(&raw) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "session file unreadable, starting empty"
                    );
                    HashMap::new()
                }
            }
        } else {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(Error::Io)?;
            }
            HashMap::new()
        };

        tracing::info!(
            sessions = sessions.len(),
            path = %path.display(),
            "session store loaded"
        );

        Ok(Self {
            window: window.max(1),
            persist_path: Some(path.to_path_buf()),
            sessions: RwLock::new(sessions),
        })
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    fn flush_locked(&self, sessions: &HashMap<String, Session>) -> Result<()> {
        let Some(path) = &self.persist_path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(sessions)
            .map_err(|e| Error::Store(format!("serializing sessions: {e}")))?;
        std::fs::write(path, json).map_err(Error::Io)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str) -> Option<Session> {
        self.sessions.read().get(session_id).cloned()
    }

    async fn put(&self, session: Session) -> Result<()> {
        let mut sessions = self.sessions.write();
        sessions.insert(session.session_id.clone(), session);
        self.flush_locked(&sessions)
    }

    async fn evict(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.write();
        let existed = sessions.remove(session_id).is_some();
        if existed {
            if let Err(e) = self.flush_locked(&sessions) {
                tracing::warn!(error = %e, "session flush after evict failed");
            }
        }
        existed
    }

    async fn resolve_or_create(&self, session_id: Option<&str>) -> (Session, bool) {
        // Fast path: session already exists.
        if let Some(id) = session_id {
            let found = self.sessions.read().get(id).cloned();
            if let Some(session) = found {
                TraceEvent::SessionResolved {
                    session_id: id.to_string(),
                    is_new: false,
                }
                .emit();
                return (session, false);
            }
        }

        // Slow path: create, keeping a caller-supplied id so a client can
        // resume across restarts.
        let id = session_id
            .map(str::to_owned)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let session = Session::new(&id);

        let mut sessions = self.sessions.write();
        let session = sessions
            .entry(id.clone())
            .or_insert(session)
            .clone();
        if let Err(e) = self.flush_locked(&sessions) {
            tracing::warn!(error = %e, "session flush after create failed");
        }
        drop(sessions);

        TraceEvent::SessionResolved {
            session_id: id,
            is_new: true,
        }
        .emit();

        (session, true)
    }

    async fn commit(&self, session_id: &str, turn: TurnCommit) -> Result<()> {
        let mut sessions = self.sessions.write();
        {
            let session = sessions
                .get_mut(session_id)
                .ok_or_else(|| Error::Store(format!("unknown session {session_id}")))?;

            for exchange in turn.appends {
                session.history.push_back(exchange);
            }
            while session.history.len() > self.window {
                session.history.pop_front();
            }
            turn.active_entity.apply(&mut session.active_entity);
            turn.pending_proposal.apply(&mut session.pending_proposal);
            session.last_active = Utc::now();
            session.turns += 1;
        }
        self.flush_locked(&sessions)
    }

    async fn sweep_idle(&self, idle_minutes: u32) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write();
        let stale: Vec<(String, i64)> = sessions
            .values()
            .filter(|s| s.idle_minutes(now) >= idle_minutes as i64)
            .map(|s| (s.session_id.clone(), s.idle_minutes(now)))
            .collect();

        for (id, idle) in &stale {
            sessions.remove(id);
            TraceEvent::SessionEvicted {
                session_id: id.clone(),
                idle_minutes: *idle,
            }
            .emit();
        }
        if !stale.is_empty() {
            if let Err(e) = self.flush_locked(&sessions) {
                tracing::warn!(error = %e, "session flush after sweep failed");
            }
        }
        stale.len()
    }
}
