use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::core::engine::KvEngine;
use crate::infra::error::{Result, TrashLogError};
use crate::trash::entry::LogEntry;
use crate::trash::format::size_format;

/// The ordered entry collection, kept as one JSON array under one key.
///
/// Every append reads the whole collection, pushes, and writes it back. The
/// write lock makes that read-modify-write atomic within this process.
pub struct EntryStore {
    engine: Arc<KvEngine>,
    write_lock: Mutex<()>,
}

impl EntryStore {
    const KEY: &'static str = "trash_log_entries";

    pub fn new(engine: Arc<KvEngine>) -> Self {
        Self {
            engine,
            write_lock: Mutex::new(()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| TrashLogError::LockPoisoned("entry_store"))
    }

    fn load(&self) -> Result<Vec<LogEntry>> {
        let bytes = match self.engine.get(Self::KEY)? {
            Some(b) => b,
            None => return Ok(Vec::new()),
        };

        match serde_json::from_slice::<Vec<LogEntry>>(&bytes) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!("stored trash log is not a valid entry list, reading as empty: {e}");
                Ok(Vec::new())
            }
        }
    }

    pub fn append(&self, entry: LogEntry) -> Result<()> {
        let _guard = self.lock()?;
        let mut entries = self.load()?;
        entries.push(entry);

        let json = serde_json::to_vec(&entries)?;
        self.engine.set(Self::KEY, json)?;

        debug!("trash log entry appended, {} total", entries.len());
        Ok(())
    }

    pub fn get_all(&self) -> Result<Vec<LogEntry>> {
        self.load()
    }

    pub fn count(&self) -> Result<usize> {
        Ok(self.load()?.len())
    }

    /// Drops the whole collection. Returns false when there was nothing stored.
    pub fn clear(&self) -> Result<bool> {
        let _guard = self.lock()?;
        let removed = self.engine.delete(Self::KEY)?;
        if removed {
            info!("trash log purged");
        }
        Ok(removed)
    }

    /// Serialized size of the collection, human readable.
    pub fn estimate_size(&self) -> Result<String> {
        let entries = self.load()?;
        let bytes = serde_json::to_vec(&entries)?;
        Ok(size_format(bytes.len() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::config::StoreConfig;
    use tempfile::tempdir;

    fn store(dir: &std::path::Path) -> Result<EntryStore> {
        let engine = KvEngine::new(StoreConfig {
            dir_path: dir.to_path_buf(),
            wal_compaction_bytes: 1024 * 1024,
        })?;
        Ok(EntryStore::new(Arc::new(engine)))
    }

    fn entry(name: &str) -> LogEntry {
        LogEntry::new(name, "Post", "01/01/2024", "", "https://x/y", 1_704_067_200)
    }

    #[test]
    fn append_keeps_insertion_order() -> Result<()> {
        let dir = tempdir()?;
        let store = store(dir.path())?;
        store.append(entry("first"))?;
        store.append(entry("second"))?;
        store.append(entry("third"))?;

        let names: Vec<_> = store
            .get_all()?
            .into_iter()
            .map(|e| e.contributor_name)
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
        assert_eq!(store.count()?, 3);
        Ok(())
    }

    #[test]
    fn clear_reports_whether_anything_was_removed() -> Result<()> {
        let dir = tempdir()?;
        let store = store(dir.path())?;
        assert!(!store.clear()?);

        store.append(entry("a"))?;
        assert!(store.clear()?);
        assert_eq!(store.count()?, 0);
        assert!(!store.clear()?);
        Ok(())
    }

    #[test]
    fn size_estimate_grows_with_entries() -> Result<()> {
        let dir = tempdir()?;
        let store = store(dir.path())?;
        assert_eq!(store.estimate_size()?, "2 B");

        store.append(entry("a"))?;
        let size = store.estimate_size()?;
        assert!(size.ends_with(" B"), "{size}");
        assert_ne!(size, "2 B");
        Ok(())
    }

    #[test]
    fn corrupt_blob_reads_as_empty() -> Result<()> {
        let dir = tempdir()?;
        let store = store(dir.path())?;
        store.engine.set(EntryStore::KEY, b"not json".to_vec())?;
        assert_eq!(store.count()?, 0);

        store.append(entry("a"))?;
        assert_eq!(store.count()?, 1);
        Ok(())
    }
}
