use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Revoked token ids, kept until the token would have expired anyway
#[async_trait]
pub trait TokenBlacklist: Send + Sync {
    /// Revoke a token id until `expires_at`. Returns `false` when it was
    /// already revoked, so only one caller can consume a token.
    async fn revoke(&self, jti: Uuid, expires_at: DateTime<Utc>) -> bool;

    /// Whether a token id has been revoked
    async fn is_revoked(&self, jti: &Uuid) -> bool;

    /// Drop entries whose tokens expired before `now`, returning how many
    async fn purge_expired(&self, now: DateTime<Utc>) -> usize;

    /// Number of entries currently held
    async fn len(&self) -> usize;
}

/// In-memory blacklist
/// Uses RwLock since lookups happen on every authenticated request
pub struct InMemoryTokenBlacklist {
    entries: Arc<RwLock<HashMap<Uuid, DateTime<Utc>>>>,
}

impl InMemoryTokenBlacklist {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryTokenBlacklist {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenBlacklist for InMemoryTokenBlacklist {
    async fn revoke(&self, jti: Uuid, expires_at: DateTime<Utc>) -> bool {
        let mut entries = self.entries.write().await;
        let fresh = entries.insert(jti, expires_at).is_none();
        debug!(jti = %jti, %expires_at, fresh, "Token revoked");
        fresh
    }

    async fn is_revoked(&self, jti: &Uuid) -> bool {
        self.entries.read().await.contains_key(jti)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at > now);
        before - entries.len()
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
