use crate::infra::codec::{decode, encode};
use crate::infra::error::{Result, TrashLogError};

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

const SNAPSHOT_MAGIC: &[u8; 8] = b"TLSNAP01";
const SNAPSHOT_FILE: &str = "snapshot.db";

/// Full copy of the live table, replaced atomically on every flush.
///
/// Layout:
/// ```text
/// [magic: 8][crc32 of payload: u32 LE][payload: bincode Vec<(key, value)>]
/// ```
pub struct Snapshot {
    pub(crate) path: PathBuf,
}

impl Snapshot {
    pub fn new(dir_path: &Path) -> Self {
        Self {
            path: dir_path.join(SNAPSHOT_FILE),
        }
    }

    /// Returns the stored pairs, or an empty list when no snapshot exists yet.
    pub fn load(&self) -> Result<Vec<(String, Vec<u8>)>> {
        let mut file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;

        if bytes.len() < SNAPSHOT_MAGIC.len() + 4 || &bytes[..8] != SNAPSHOT_MAGIC {
            return Err(TrashLogError::SnapshotCorruption(
                "bad magic header".to_string(),
            ));
        }

        let mut crc_buf = [0u8; 4];
        crc_buf.copy_from_slice(&bytes[8..12]);
        let expected = u32::from_le_bytes(crc_buf);
        let payload = &bytes[12..];
        let actual = crc32fast::hash(payload);
        if actual != expected {
            return Err(TrashLogError::SnapshotCorruption(format!(
                "checksum mismatch: expected {expected:08x}, got {actual:08x}"
            )));
        }

        let pairs: Vec<(String, Vec<u8>)> = decode(payload)
            .map_err(|e| TrashLogError::SnapshotCorruption(e.to_string()))?;
        debug!("Snapshot loaded: {} keys from {}", pairs.len(), self.path.display());
        Ok(pairs)
    }

    /// Writes to a temporary file, syncs, then renames over the old snapshot.
    pub fn write<'a, I>(&self, pairs: I) -> Result<usize>
    where
        I: IntoIterator<Item = (&'a String, &'a Vec<u8>)>,
    {
        let owned: Vec<(&String, &Vec<u8>)> = pairs.into_iter().collect();
        let payload = encode(&owned)?;
        let checksum = crc32fast::hash(&payload);

        let tmp_path = self.path.with_extension("db.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            writer.write_all(SNAPSHOT_MAGIC)?;
            writer.write_all(&checksum.to_le_bytes())?;
            writer.write_all(&payload)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        debug!(
            "Snapshot written: {} keys, {} bytes",
            owned.len(),
            payload.len()
        );
        Ok(owned.len())
    }

    pub fn len_bytes(&self) -> u64 {
        fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    #[test]
    fn missing_snapshot_loads_empty() -> Result<()> {
        let dir = tempdir()?;
        assert!(Snapshot::new(dir.path()).load()?.is_empty());
        Ok(())
    }

    #[test]
    fn written_pairs_load_back() -> Result<()> {
        let dir = tempdir()?;
        let snapshot = Snapshot::new(dir.path());

        let mut table = BTreeMap::new();
        table.insert("a".to_string(), b"1".to_vec());
        table.insert("b".to_string(), b"22".to_vec());
        assert_eq!(snapshot.write(table.iter())?, 2);

        let loaded = snapshot.load()?;
        assert_eq!(
            loaded,
            vec![
                ("a".to_string(), b"1".to_vec()),
                ("b".to_string(), b"22".to_vec())
            ]
        );
        Ok(())
    }

    #[test]
    fn flipped_byte_is_detected() -> Result<()> {
        let dir = tempdir()?;
        let snapshot = Snapshot::new(dir.path());
        let mut table = BTreeMap::new();
        table.insert("key".to_string(), b"value".to_vec());
        snapshot.write(table.iter())?;

        let mut bytes = fs::read(&snapshot.path)?;
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        fs::write(&snapshot.path, bytes)?;

        assert!(matches!(
            snapshot.load(),
            Err(TrashLogError::SnapshotCorruption(_))
        ));
        Ok(())
    }
}
