use crate::core::kv_record::KvRecord;
use crate::infra::codec::{decode, encode, read_frame, write_frame, MAX_FRAME_BYTES};
use crate::infra::error::{Result, TrashLogError};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

pub struct WriteAheadLog {
    pub(crate) file: Mutex<BufWriter<File>>,
    pub(crate) path: PathBuf,
}

/// Length prefix preceding every WAL frame.
const FRAME_HEADER_BYTES: u64 = 4;

impl WriteAheadLog {
    pub fn new(dir_path: &Path) -> Result<Self> {
        let wal_path = dir_path.join("wal.log");
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&wal_path)?;

        Ok(Self {
            file: Mutex::new(BufWriter::new(file)),
            path: wal_path,
        })
    }

    pub fn write_record(&self, record: &KvRecord) -> Result<()> {
        let serialized = encode(record)?;

        let mut writer = self
            .file
            .lock()
            .map_err(|_| TrashLogError::LockPoisoned("wal_writer"))?;

        write_frame(&mut *writer, &serialized)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;

        debug!(
            "WAL persisted: key={}, delete={}, ts={}",
            record.key,
            record.is_delete(),
            record.written_at
        );
        Ok(())
    }

    /// Replays every complete record.
    ///
    /// A damaged tail (torn append, bad length, undecodable payload) is cut
    /// off at the end of the last good record, so the records before it
    /// stay readable.
    pub fn recover(&self) -> Result<Vec<KvRecord>> {
        let mut records = Vec::new();
        let mut good_end: u64 = 0;
        let mut damaged = false;
        let mut reader = BufReader::new(File::open(&self.path)?);

        loop {
            match read_frame(&mut reader, MAX_FRAME_BYTES) {
                Ok(Some(frame)) => match decode::<KvRecord>(&frame) {
                    Ok(record) => {
                        good_end += FRAME_HEADER_BYTES + frame.len() as u64;
                        records.push(record);
                    }
                    Err(_) => {
                        damaged = true;
                        break;
                    }
                },
                Ok(None) => break,
                Err(TrashLogError::WalCorruption) => {
                    damaged = true;
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        drop(reader);

        if damaged {
            let total = self.len_bytes();
            warn!(
                "WAL {} has a damaged tail: kept {} records, dropped {} bytes",
                self.path.display(),
                records.len(),
                total.saturating_sub(good_end)
            );
            let file = OpenOptions::new().write(true).open(&self.path)?;
            file.set_len(good_end)?;
            file.sync_all()?;
        }

        Ok(records)
    }

    pub fn len_bytes(&self) -> u64 {
        std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }

    /// Truncates the log after its records were folded into a snapshot.
    pub fn clear(&self) -> Result<()> {
        let mut guard = self
            .file
            .lock()
            .map_err(|_| TrashLogError::LockPoisoned("wal_writer"))?;

        guard.flush()?;
        guard.get_ref().sync_all()?;

        let truncfile = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        truncfile.sync_all()?;

        let appendfile = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        *guard = BufWriter::new(appendfile);
        Ok(())
    }
}
