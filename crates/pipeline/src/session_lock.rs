//! Per-session turn serialization.
//!
//! Each session holds a one-permit semaphore; a turn owns the permit
//! for its whole lifetime, so two requests on the same session can
//! never interleave their reads and end-of-turn commits. Different
//! sessions never contend.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Returned by [`SessionLockMap::try_acquire`] when a turn is already
/// running on the session. The gateway maps it to 429.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionBusy;

impl fmt::Display for SessionBusy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a turn is already running for this session")
    }
}

impl std::error::Error for SessionBusy {}

#[derive(Default)]
pub struct SessionLockMap {
    locks: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl SessionLockMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn semaphore(&self, session_id: &str) -> Arc<Semaphore> {
        self.locks
            .lock()
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(1)))
            .clone()
    }

    /// Wait for the session's turn slot. The permit releases on drop.
    pub async fn acquire(&self, session_id: &str) -> Result<OwnedSemaphorePermit, SessionBusy> {
        let semaphore = self.semaphore(session_id);
        semaphore.acquire_owned().await.map_err(|_| SessionBusy)
    }

    /// Take the slot only if it is free right now.
    pub fn try_acquire(&self, session_id: &str) -> Result<OwnedSemaphorePermit, SessionBusy> {
        let semaphore = self.semaphore(session_id);
        semaphore.try_acquire_owned().map_err(|_| SessionBusy)
    }

    pub fn session_count(&self) -> usize {
        self.locks.lock().len()
    }

    /// Drop semaphores nobody currently holds. Safe to run on a timer;
    /// a session that comes back simply gets a fresh semaphore.
    pub fn prune_idle(&self) {
        self.locks
            .lock()
            .retain(|_, sem| sem.available_permits() == 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn sequential_turns_on_one_session() {
        let locks = SessionLockMap::new();
        let first = locks.acquire("s1").await.expect("lock");
        drop(first);
        let _second = locks.acquire("s1").await.expect("lock");
    }

    #[tokio::test]
    async fn different_sessions_do_not_contend() {
        let locks = SessionLockMap::new();
        let _a = locks.acquire("a").await.expect("lock");
        // Would deadlock if sessions shared a lock.
        let _b = locks.acquire("b").await.expect("lock");
        assert_eq!(locks.session_count(), 2);
    }

    #[tokio::test]
    async fn waiter_proceeds_after_holder_drops() {
        let locks = Arc::new(SessionLockMap::new());
        let permit = locks.acquire("s1").await.expect("lock");

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _permit = locks.acquire("s1").await.expect("lock");
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(permit);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should finish")
            .expect("waiter should not panic");
    }

    #[tokio::test]
    async fn try_acquire_reports_busy() {
        let locks = SessionLockMap::new();
        let held = locks.try_acquire("s1").expect("free slot");
        assert!(matches!(locks.try_acquire("s1"), Err(SessionBusy)));
        drop(held);
        assert!(locks.try_acquire("s1").is_ok());
    }

    #[tokio::test]
    async fn prune_keeps_held_locks() {
        let locks = SessionLockMap::new();
        let _held = locks.try_acquire("busy").expect("free slot");
        drop(locks.acquire("idle").await.expect("lock"));
        assert_eq!(locks.session_count(), 2);

        locks.prune_idle();
        assert_eq!(locks.session_count(), 1);
        assert!(locks.try_acquire("busy").is_err());
    }
}
