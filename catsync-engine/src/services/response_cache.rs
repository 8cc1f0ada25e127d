//! Persistent response cache for secondary lookups
//!
//! Shared (`Arc`) across concurrent lookups. Entries older than the
//! configured maximum age read as misses. Persisting is dirty-gated: nothing
//! is written unless an entry was set since the last load or persist.

use crate::error::SyncResult;
use crate::types::{CatalogKind, EntryId, Service};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedResponse {
    stored_at: DateTime<Utc>,
    payload: serde_json::Value,
}

pub struct ResponseCache {
    entries: RwLock<HashMap<String, CachedResponse>>,
    max_age: Duration,
    dirty: AtomicBool,
}

/// Cache key for a title lookup
pub fn title_key(kind: CatalogKind, service: Service, id: EntryId) -> String {
    format!("titles:{}:{}:{}", kind, service, id)
}

impl ResponseCache {
    pub fn new(max_age: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_age,
            dirty: AtomicBool::new(false),
        }
    }

    /// Load a cache file; a missing or unreadable file starts an empty cache
    pub fn load(path: &Path, max_age: Duration) -> SyncResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No response cache file");
            return Ok(Self::new(max_age));
        }

        let content = std::fs::read(path)?;
        let entries: HashMap<String, CachedResponse> = match serde_json::from_slice(&content) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Response cache unreadable, starting empty");
                HashMap::new()
            }
        };

        info!(path = %path.display(), entries = entries.len(), "Loaded response cache");
        Ok(Self {
            entries: RwLock::new(entries),
            max_age,
            dirty: AtomicBool::new(false),
        })
    }

    fn is_fresh(&self, cached: &CachedResponse, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(self.max_age) {
            Ok(max_age) => now.signed_duration_since(cached.stored_at) <= max_age,
            Err(_) => true,
        }
    }

    /// Payload for `key`, unless missing or expired
    pub async fn get(&self, key: &str) -> Option<serde_json::Value> {
        let entries = self.entries.read().await;
        let cached = entries.get(key)?;
        if self.is_fresh(cached, Utc::now()) {
            Some(cached.payload.clone())
        } else {
            debug!(key, "Cached response expired");
            None
        }
    }

    /// Typed variant of [`get`](Self::get); a payload of the wrong shape is a miss
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let payload = self.get(key).await?;
        serde_json::from_value(payload).ok()
    }

    pub async fn set(&self, key: impl Into<String>, payload: serde_json::Value) {
        let cached = CachedResponse {
            stored_at: Utc::now(),
            payload,
        };
        self.entries.write().await.insert(key.into(), cached);
        self.dirty.store(true, Ordering::SeqCst);
    }

    pub async fn set_as<T: Serialize>(&self, key: impl Into<String>, value: &T) -> SyncResult<()> {
        let payload = serde_json::to_value(value)?;
        self.set(key, payload).await;
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Write the cache as JSON when it changed since the last load or persist
    ///
    /// Expired entries are dropped. Returns `true` when a file was written.
    pub async fn persist(&self, path: &Path) -> SyncResult<bool> {
        if !self.is_dirty() {
            debug!(path = %path.display(), "Response cache unchanged, not persisting");
            return Ok(false);
        }

        let mut entries = self.entries.write().await;
        let now = Utc::now();
        entries.retain(|_, cached| self.is_fresh(cached, now));

        let json = serde_json::to_vec(&*entries)?;
        catsync_common::config::write_atomic(path, &json)?;
        self.dirty.store(false, Ordering::SeqCst);

        info!(path = %path.display(), entries = entries.len(), "Persisted response cache");
        Ok(true)
    }
}
