use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum KvOp {
    Put(Vec<u8>),
    Delete,
}

/// One mutation of the key-value table, as written to the WAL.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct KvRecord {
    pub key: String,
    pub op: KvOp,
    /// Nanoseconds since the epoch; only used for diagnostics.
    pub written_at: u128,
}

impl KvRecord {
    pub fn put(key: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            op: KvOp::Put(value),
            written_at: now_nanos(),
        }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            op: KvOp::Delete,
            written_at: now_nanos(),
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self.op, KvOp::Delete)
    }
}

fn now_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
}
