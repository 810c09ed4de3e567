use crate::infra::error::{Result, TrashLogError};
use bincode::Options;
use serde::{de::DeserializeOwned, Serialize};
use std::io::{self, BufRead, Read, Write};

fn opts() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
}

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(opts().serialize(value)?)
}

pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    Ok(opts().deserialize::<T>(data)?)
}

/// Largest payload a frame may carry, on both the write and the read side.
pub const MAX_FRAME_BYTES: usize = 32 * 1024 * 1024;

/// Writes `[u32 LE length][payload]`. Nothing is written when the payload
/// exceeds [`MAX_FRAME_BYTES`].
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<()> {
    if payload.len() > MAX_FRAME_BYTES {
        return Err(TrashLogError::RecordTooLarge {
            size: payload.len(),
            limit: MAX_FRAME_BYTES,
        });
    }
    let length = payload.len() as u32;
    writer.write_all(&length.to_le_bytes())?;
    writer.write_all(payload)?;
    Ok(())
}

/// Reads one frame written by [`write_frame`].
///
/// Returns `Ok(None)` on a clean end of input. A short length prefix, a
/// zero or oversized length, or a truncated payload is `WalCorruption`.
pub fn read_frame<R: BufRead>(reader: &mut R, max_len: usize) -> Result<Option<Vec<u8>>> {
    if reader.fill_buf()?.is_empty() {
        return Ok(None);
    }

    let mut prefix = [0u8; 4];
    read_exact_or_corrupt(reader, &mut prefix)?;
    let length = u32::from_le_bytes(prefix) as usize;
    if length == 0 || length > max_len {
        return Err(TrashLogError::WalCorruption);
    }

    let mut buffer = vec![0u8; length];
    read_exact_or_corrupt(reader, &mut buffer)?;
    Ok(Some(buffer))
}

fn read_exact_or_corrupt<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            TrashLogError::WalCorruption
        } else {
            e.into()
        }
    })
}
