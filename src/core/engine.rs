use crate::core::kv_record::KvRecord;
use crate::core::memtable::MemTable;
use crate::infra::config::StoreConfig;
use crate::infra::error::{Result, TrashLogError};
use crate::storage::snapshot::Snapshot;
use crate::storage::wal::WriteAheadLog;

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Serialize)]
pub struct KvStats {
    pub keys: usize,
    pub mem_kb: usize,
    pub wal_kb: u64,
    pub snapshot_kb: u64,
}

/// Durable key-value table backing every logical key of the crate.
///
/// Writes go to the WAL first and then to the in-memory table. When the WAL
/// outgrows `wal_compaction_bytes` the whole table is written to a
/// checksummed snapshot and the WAL is truncated. Startup loads the snapshot
/// and replays the WAL on top of it.
pub struct KvEngine {
    pub(crate) memtable: Mutex<MemTable>,
    pub(crate) wal: WriteAheadLog,
    pub(crate) snapshot: Snapshot,
    pub(crate) dir_path: PathBuf,
    pub(crate) config: StoreConfig,
}

impl KvEngine {
    pub fn new(config: StoreConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.dir_path)?;

        let snapshot = Snapshot::new(&config.dir_path);
        let wal = WriteAheadLog::new(&config.dir_path)?;

        let mut memtable = MemTable::new();
        for (key, value) in snapshot.load()? {
            memtable.apply(KvRecord::put(key, value));
        }
        let wal_records = wal.recover()?;
        let replayed = wal_records.len();
        for record in wal_records {
            memtable.apply(record);
        }

        info!(
            "KV engine opened at {}: {} keys, {} WAL records replayed",
            config.dir_path.display(),
            memtable.len(),
            replayed
        );

        Ok(Self {
            memtable: Mutex::new(memtable),
            wal,
            snapshot,
            dir_path: config.dir_path.clone(),
            config,
        })
    }

    fn memtable_lock(&self) -> Result<MutexGuard<'_, MemTable>> {
        self.memtable
            .lock()
            .map_err(|_| TrashLogError::LockPoisoned("memtable"))
    }

    pub fn set(&self, key: impl Into<String>, value: Vec<u8>) -> Result<()> {
        self.write(KvRecord::put(key, value)).map(|_| ())
    }

    /// Removes a key. Returns true when it held a value.
    pub fn delete(&self, key: impl Into<String>) -> Result<bool> {
        let key = key.into();
        if !self.memtable_lock()?.contains(&key) {
            return Ok(false);
        }
        self.write(KvRecord::delete(key))
    }

    fn write(&self, record: KvRecord) -> Result<bool> {
        // Holding the table lock across the WAL append keeps WAL order equal
        // to apply order.
        let mut memtable = self.memtable_lock()?;
        self.wal.write_record(&record)?;
        let existed = memtable.apply(record);
        drop(memtable);

        if self.wal.len_bytes() >= self.config.wal_compaction_bytes {
            self.compact()?;
        }
        Ok(existed)
    }

    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.memtable_lock()?.get(key))
    }

    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.memtable_lock()?.contains(key))
    }

    pub fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let memtable = self.memtable_lock()?;
        Ok(memtable
            .iter_ordered()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    /// Folds the table into a new snapshot and truncates the WAL.
    pub fn compact(&self) -> Result<()> {
        let memtable = self.memtable_lock()?;
        let written = self.snapshot.write(memtable.iter_ordered())?;
        self.wal.clear()?;
        drop(memtable);

        debug!(
            "KV compaction at {}: {} keys in snapshot",
            self.dir_path.display(),
            written
        );
        Ok(())
    }

    pub fn stats(&self) -> Result<KvStats> {
        let memtable = self.memtable_lock()?;
        Ok(KvStats {
            keys: memtable.len(),
            mem_kb: memtable.size_bytes / 1024,
            wal_kb: self.wal.len_bytes() / 1024,
            snapshot_kb: self.snapshot.len_bytes() / 1024,
        })
    }
}
