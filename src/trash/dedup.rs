use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::core::engine::KvEngine;
use crate::infra::codec::{decode, encode};
use crate::infra::error::{Result, TrashLogError};
use crate::trash::clock::Clock;
use crate::trash::content::ContentId;

/// Keyed markers with passive expiry. A marker counts as absent once its
/// expiry instant has passed; nothing sweeps them in the background.
pub trait MarkerStore: Send + Sync {
    fn is_marked(&self, key: &str) -> Result<bool>;
    fn mark(&self, key: &str, ttl_secs: u64) -> Result<()>;
}

/// Process-local markers. Lost on restart, which at worst lets one duplicate
/// through.
pub struct MemoryMarkerStore {
    expiries: Mutex<HashMap<String, i64>>,
    clock: Arc<dyn Clock>,
}

impl MemoryMarkerStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            expiries: Mutex::new(HashMap::new()),
            clock,
        }
    }
}

impl MarkerStore for MemoryMarkerStore {
    fn is_marked(&self, key: &str) -> Result<bool> {
        let mut expiries = self
            .expiries
            .lock()
            .map_err(|_| TrashLogError::LockPoisoned("dedup_markers"))?;
        match expiries.get(key) {
            Some(&expires_at) if expires_at > self.clock.now_secs() => Ok(true),
            Some(_) => {
                expiries.remove(key);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    fn mark(&self, key: &str, ttl_secs: u64) -> Result<()> {
        let expires_at = self.clock.now_secs().saturating_add(ttl_secs as i64);
        self.expiries
            .lock()
            .map_err(|_| TrashLogError::LockPoisoned("dedup_markers"))?
            .insert(key.to_string(), expires_at);
        Ok(())
    }
}

/// Markers persisted in the key-value engine as `dedup:<key>` → expiry
/// (epoch seconds, bincode `i64`).
pub struct KvMarkerStore {
    engine: Arc<KvEngine>,
    clock: Arc<dyn Clock>,
}

impl KvMarkerStore {
    const PREFIX: &'static str = "dedup:";

    pub fn new(engine: Arc<KvEngine>, clock: Arc<dyn Clock>) -> Self {
        Self { engine, clock }
    }

    fn storage_key(key: &str) -> String {
        format!("{}{}", Self::PREFIX, key)
    }

    /// Deletes every expired marker. Returns how many were removed.
    pub fn purge_expired(&self) -> Result<usize> {
        let now = self.clock.now_secs();
        let mut removed = 0;
        for key in self.engine.keys_with_prefix(Self::PREFIX)? {
            let expired = match self.engine.get(&key)? {
                Some(bytes) => decode::<i64>(&bytes).map_or(true, |exp| exp <= now),
                None => false,
            };
            if expired && self.engine.delete(key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

impl MarkerStore for KvMarkerStore {
    fn is_marked(&self, key: &str) -> Result<bool> {
        let storage_key = Self::storage_key(key);
        let Some(bytes) = self.engine.get(&storage_key)? else {
            return Ok(false);
        };

        let expires_at: i64 = decode(&bytes)?;
        if expires_at > self.clock.now_secs() {
            return Ok(true);
        }
        self.engine.delete(storage_key)?;
        Ok(false)
    }

    fn mark(&self, key: &str, ttl_secs: u64) -> Result<()> {
        let expires_at = self.clock.now_secs().saturating_add(ttl_secs as i64);
        self.engine.set(Self::storage_key(key), encode(&expires_at)?)
    }
}

/// Suppresses a second capture of the same content within the TTL window.
///
/// Backend failures fail open: an unreadable marker is treated as absent and
/// a failed mark is only logged, so a deletion is never silently dropped.
pub struct DedupGuard {
    markers: Arc<dyn MarkerStore>,
    ttl_secs: u64,
}

impl DedupGuard {
    pub fn new(markers: Arc<dyn MarkerStore>, ttl_secs: u64) -> Self {
        Self { markers, ttl_secs }
    }

    pub fn key_for(id: ContentId) -> String {
        format!("trash_log_logged_{id}")
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    pub fn already_marked(&self, id: ContentId) -> bool {
        let key = Self::key_for(id);
        match self.markers.is_marked(&key) {
            Ok(marked) => {
                if marked {
                    debug!("dedup hit for {key}");
                }
                marked
            }
            Err(e) => {
                warn!("dedup store unavailable, logging {key} anyway: {e}");
                false
            }
        }
    }

    pub fn mark(&self, id: ContentId) {
        let key = Self::key_for(id);
        if let Err(e) = self.markers.mark(&key, self.ttl_secs) {
            warn!("failed to set dedup marker {key}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::config::StoreConfig;
    use crate::trash::clock::ManualClock;
    use tempfile::tempdir;

    struct BrokenStore;

    impl MarkerStore for BrokenStore {
        fn is_marked(&self, _key: &str) -> Result<bool> {
            Err(TrashLogError::LockPoisoned("broken"))
        }
        fn mark(&self, _key: &str, _ttl_secs: u64) -> Result<()> {
            Err(TrashLogError::LockPoisoned("broken"))
        }
    }

    #[test]
    fn memory_markers_expire_passively() -> Result<()> {
        let clock = Arc::new(ManualClock::new(1_000));
        let store = MemoryMarkerStore::new(clock.clone());

        store.mark("k", 60)?;
        assert!(store.is_marked("k")?);
        clock.advance(59);
        assert!(store.is_marked("k")?);
        clock.advance(1);
        assert!(!store.is_marked("k")?);
        Ok(())
    }

    #[test]
    fn mark_is_idempotent_and_refreshes() -> Result<()> {
        let clock = Arc::new(ManualClock::new(0));
        let store = MemoryMarkerStore::new(clock.clone());

        store.mark("k", 60)?;
        clock.advance(30);
        store.mark("k", 60)?;
        clock.advance(45);
        assert!(store.is_marked("k")?);
        Ok(())
    }

    #[test]
    fn kv_markers_survive_reopen_and_expire() -> Result<()> {
        let dir = tempdir()?;
        let config = StoreConfig {
            dir_path: dir.path().to_path_buf(),
            wal_compaction_bytes: 1024 * 1024,
        };
        let clock = Arc::new(ManualClock::new(5_000));

        {
            let engine = Arc::new(KvEngine::new(config.clone())?);
            KvMarkerStore::new(engine, clock.clone()).mark("k", 60)?;
        }

        let engine = Arc::new(KvEngine::new(config)?);
        let store = KvMarkerStore::new(engine.clone(), clock.clone());
        assert!(store.is_marked("k")?);

        clock.advance(61);
        assert!(!store.is_marked("k")?);
        assert!(!engine.contains("dedup:k")?);
        Ok(())
    }

    #[test]
    fn purge_removes_only_expired_markers() -> Result<()> {
        let dir = tempdir()?;
        let engine = Arc::new(KvEngine::new(StoreConfig {
            dir_path: dir.path().to_path_buf(),
            wal_compaction_bytes: 1024 * 1024,
        })?);
        let clock = Arc::new(ManualClock::new(0));
        let store = KvMarkerStore::new(engine, clock.clone());

        store.mark("old", 10)?;
        store.mark("fresh", 100)?;
        clock.advance(50);

        assert_eq!(store.purge_expired()?, 1);
        assert!(store.is_marked("fresh")?);
        Ok(())
    }

    #[test]
    fn guard_fails_open() {
        let guard = DedupGuard::new(Arc::new(BrokenStore), 60);
        guard.mark(1);
        assert!(!guard.already_marked(1));
    }
}
