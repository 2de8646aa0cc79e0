//! Single-use wallet challenges.
//!
//! Challenges live only in process memory: the store is created at service
//! start and torn down at shutdown. A background sweep evicts expired
//! entries that were never verified.

use std::collections::HashMap;

use rand::RngCore;
use tokio::sync::Mutex;
use tracing::debug;

use hydra_core::db::unix_timestamp;

/// A nonce-bearing message a wallet must sign to prove key ownership.
#[derive(Debug, Clone)]
pub struct Challenge {
    pub wallet_address: String,
    pub nonce: String,
    pub message: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl Challenge {
    pub fn is_expired(&self) -> bool {
        unix_timestamp() >= self.expires_at
    }
}

/// In-memory table of outstanding challenges, keyed by wallet address.
pub struct ChallengeStore {
    ttl_secs: i64,
    inner: Mutex<HashMap<String, Challenge>>,
}

impl ChallengeStore {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            ttl_secs,
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a fresh challenge for a wallet, replacing any outstanding one.
    pub async fn issue(&self, wallet_address: &str) -> Challenge {
        let mut nonce_bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = hex::encode(nonce_bytes);

        let issued_at = unix_timestamp();
        let message = format!(
            "Sign this message to authenticate with Hydra.\n\nWallet: {wallet_address}\nNonce: {nonce}\nIssued at: {issued_at}"
        );

        let challenge = Challenge {
            wallet_address: wallet_address.to_string(),
            nonce,
            message,
            issued_at,
            expires_at: issued_at + self.ttl_secs,
        };

        self.inner
            .lock()
            .await
            .insert(wallet_address.to_string(), challenge.clone());

        challenge
    }

    /// Remove and return the outstanding challenge for a wallet.
    ///
    /// Lookup and delete happen under one lock acquisition, so two
    /// concurrent verification attempts can never both obtain the same
    /// challenge.
    pub async fn take(&self, wallet_address: &str) -> Option<Challenge> {
        self.inner.lock().await.remove(wallet_address)
    }

    /// Evict expired challenges. Returns the number removed.
    pub async fn purge_expired(&self) -> usize {
        let mut table = self.inner.lock().await;
        let before = table.len();
        table.retain(|_, challenge| !challenge.is_expired());
        let removed = before - table.len();
        if removed > 0 {
            debug!(removed, "Purged expired challenges");
        }
        removed
    }

    /// Number of outstanding challenges.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}
