//! Cooperative cancellation for in-flight turns.
//!
//! A turn checks its token before every model and retrieval call; a
//! cancel request flips the flag and the turn bails at the next
//! checkpoint with [`Error::Cancelled`](ca_domain::error::Error). The
//! work already done is abandoned, and because session state only
//! commits at end of turn, a cancelled turn leaves no trace.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Tokens for currently-running turns, keyed by session id. A session
/// runs at most one turn at a time, so the session id is the natural
/// key.
#[derive(Default)]
pub struct CancelMap {
    tokens: Mutex<HashMap<String, CancelToken>>,
}

impl CancelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh token for a starting turn. A leftover token
    /// under the same session is replaced; the old turn, if somehow
    /// still alive, keeps its own clone.
    pub fn register(&self, session_id: &str) -> CancelToken {
        let token = CancelToken::new();
        self.tokens
            .lock()
            .insert(session_id.to_string(), token.clone());
        token
    }

    /// Flip the flag for a running turn. Returns false when nothing is
    /// in flight for the session.
    pub fn cancel(&self, session_id: &str) -> bool {
        match self.tokens.lock().get(session_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Drop the token once the turn finishes, whatever the outcome.
    pub fn remove(&self, session_id: &str) {
        self.tokens.lock().remove(session_id);
    }
}
