//! Per-key mutual exclusion for lifecycle transitions.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

/// Lock table keyed by (user, engine). Transitions on the same key are
/// serialized so the read-check-write sequence is atomic; distinct keys
/// proceed in parallel.
#[derive(Default)]
pub struct KeyedLocks {
    inner: Mutex<HashMap<(String, String), Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the lock for a key. The caller holds the returned
    /// `Arc` and locks it for the duration of the transition.
    pub async fn acquire(&self, user_id: &str, engine_id: &str) -> Arc<Mutex<()>> {
        let mut table = self.inner.lock().await;
        Arc::clone(
            table
                .entry((user_id.to_string(), engine_id.to_string()))
                .or_default(),
        )
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_key_returns_same_lock() {
        let locks = KeyedLocks::new();
        let a = locks.acquire("u1", "e1").await;
        let b = locks.acquire("u1", "e1").await;
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn distinct_keys_are_independent() {
        let locks = KeyedLocks::new();
        let a = locks.acquire("u1", "e1").await;
        let b = locks.acquire("u1", "e2").await;
        assert!(!Arc::ptr_eq(&a, &b));

        // Holding one key's guard must not block the other key.
        let _guard_a = a.lock().await;
        let guard_b = b.try_lock();
        assert!(guard_b.is_ok());
    }
}
