//! Keyed mutual exclusion for chat turns and relationship updates.
//!
//! A whole chat turn (append user message, call the provider, append the AI
//! reply, bump the relationship) holds the lock for its conversation key so
//! interleaved turns cannot interleave their side effects. Different keys
//! proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use lifeweave_schema::{ConversationId, PersonaId, UserId};
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};

/// What a lock protects. Typed keys keep conversation locks and
/// relationship locks in disjoint namespaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LockKey {
    Conversation(ConversationId),
    Relationship(UserId, PersonaId),
    User(UserId),
}

#[derive(Clone)]
pub struct KeyedLocks {
    entries: Arc<Mutex<HashMap<LockKey, Arc<Semaphore>>>>,
    /// Optional cap on permits held across all keys.
    global: Option<Arc<Semaphore>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            global: None,
        }
    }

    pub fn with_global_limit(max_concurrent: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            global: Some(Arc::new(Semaphore::new(max_concurrent))),
        }
    }

    /// Waits for exclusive access to `key`. The guard releases on drop.
    pub async fn acquire(&self, key: LockKey) -> KeyGuard {
        // Global permit first so a waiting turn does not pin its key.
        let global_permit = match &self.global {
            Some(sem) => Some(
                sem.clone()
                    .acquire_owned()
                    .await
                    .expect("global semaphore closed"),
            ),
            None => None,
        };

        let key_sem = {
            let mut entries = self.entries.lock().await;
            entries
                .entry(key)
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };
        let key_permit = key_sem.acquire_owned().await.expect("key semaphore closed");

        KeyGuard {
            _key_permit: key_permit,
            _global_permit: global_permit,
        }
    }

    /// Drops semaphores nobody holds. Callers with long-lived managers can
    /// run this periodically to keep the map bounded.
    pub async fn shrink(&self) {
        let mut entries = self.entries.lock().await;
        entries.retain(|_, sem| sem.available_permits() < 1);
    }
}

impl Default for KeyedLocks {
    fn default() -> Self {
        Self::new()
    }
}

pub struct KeyGuard {
    _key_permit: OwnedSemaphorePermit,
    _global_permit: Option<OwnedSemaphorePermit>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_serializes() {
        let locks = KeyedLocks::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let l1 = locks.clone();
        let c1 = counter.clone();
        let first = tokio::spawn(async move {
            let _guard = l1.acquire(LockKey::Conversation(1)).await;
            c1.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(40)).await;
            c1.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(10)).await;

        let l2 = locks.clone();
        let c2 = counter.clone();
        let second = tokio::spawn(async move {
            let _guard = l2.acquire(LockKey::Conversation(1)).await;
            assert!(c2.load(Ordering::SeqCst) >= 2);
        });

        first.await.unwrap();
        second.await.unwrap();
    }

    #[tokio::test]
    async fn different_keys_run_in_parallel() {
        let locks = KeyedLocks::new();
        let _held = locks.acquire(LockKey::Conversation(1)).await;
        // A different conversation and a relationship key are both free.
        let other = tokio::time::timeout(
            Duration::from_millis(50),
            locks.acquire(LockKey::Conversation(2)),
        )
        .await;
        assert!(other.is_ok());
        let rel = tokio::time::timeout(
            Duration::from_millis(50),
            locks.acquire(LockKey::Relationship(1, PersonaId::LifeMentor)),
        )
        .await;
        assert!(rel.is_ok());
    }

    #[tokio::test]
    async fn global_limit_caps_concurrency() {
        let locks = KeyedLocks::with_global_limit(2);
        let in_flight = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..6)
            .map(|i| {
                let locks = locks.clone();
                let in_flight = in_flight.clone();
                tokio::spawn(async move {
                    let _guard = locks.acquire(LockKey::Conversation(i)).await;
                    let current = in_flight.fetch_add(1, Ordering::SeqCst);
                    assert!(current < 2);
                    tokio::time::sleep(Duration::from_millis(15)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }
    }

    #[tokio::test]
    async fn shrink_drops_idle_entries() {
        let locks = KeyedLocks::new();
        {
            let _guard = locks.acquire(LockKey::User(7)).await;
        }
        locks.shrink().await;
        assert!(locks.entries.lock().await.is_empty());
    }
}
