use crate::core::kv_record::{KvOp, KvRecord};
use std::collections::BTreeMap;

/// Live key-value pairs. Tombstones remove the key instead of being kept,
/// since every flush writes the whole table to a snapshot.
#[derive(Default)]
pub struct MemTable {
    pub(crate) data: BTreeMap<String, Vec<u8>>,
    pub(crate) size_bytes: usize,
}

impl MemTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a record. Returns true when the key held a value before.
    pub fn apply(&mut self, record: KvRecord) -> bool {
        let KvRecord { key, op, .. } = record;

        let previous = match op {
            KvOp::Delete => self.data.remove(&key),
            KvOp::Put(value) => {
                self.size_bytes += Self::estimate_size(&key, &value);
                self.data.insert(key.clone(), value)
            }
        };

        if let Some(old) = &previous {
            self.size_bytes = self
                .size_bytes
                .saturating_sub(Self::estimate_size(&key, old));
        }
        previous.is_some()
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.data.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn iter_ordered(&self) -> impl Iterator<Item = (&String, &Vec<u8>)> {
        self.data.iter()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn estimate_size(key: &str, value: &[u8]) -> usize {
        key.len() + value.len() + 32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memtable_ordering() {
        let mut mt = MemTable::new();
        mt.apply(KvRecord::put("charlie".to_string(), b"3".to_vec()));
        mt.apply(KvRecord::put("alice".to_string(), b"1".to_vec()));
        mt.apply(KvRecord::put("bob".to_string(), b"2".to_vec()));

        let keys: Vec<_> = mt.iter_ordered().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["alice", "bob", "charlie"]);
    }

    #[test]
    fn tombstone_removes_and_reports_presence() {
        let mut mt = MemTable::new();
        assert!(!mt.apply(KvRecord::delete("k".to_string())));

        mt.apply(KvRecord::put("k".to_string(), b"v".to_vec()));
        assert!(mt.size_bytes > 0);
        assert!(mt.apply(KvRecord::delete("k".to_string())));
        assert!(mt.get("k").is_none());
        assert_eq!(mt.size_bytes, 0);
    }

    #[test]
    fn overwrite_keeps_size_accounting() {
        let mut mt = MemTable::new();
        mt.apply(KvRecord::put("k".to_string(), vec![0u8; 100]));
        mt.apply(KvRecord::put("k".to_string(), vec![0u8; 10]));
        assert_eq!(mt.size_bytes, 1 + 10 + 32);
        assert_eq!(mt.len(), 1);
    }
}
