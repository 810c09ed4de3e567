//! Display formatting shared by the logger, the store and the exporter.

use chrono::{DateTime, FixedOffset, Offset, Utc};

const UNITS: [(&str, u64); 4] = [
    ("TB", 1024 * 1024 * 1024 * 1024),
    ("GB", 1024 * 1024 * 1024),
    ("MB", 1024 * 1024),
    ("KB", 1024),
];

/// Human-readable byte size with one decimal, 1024 based.
///
/// `0 -> "0 B"`, `512 -> "512 B"`, `1536 -> "1.5 KB"`, `2 MiB -> "2.0 MB"`.
pub fn size_format(bytes: u64) -> String {
    for (unit, magnitude) in UNITS {
        if bytes >= magnitude {
            return format!("{:.1} {}", bytes as f64 / magnitude as f64, unit);
        }
    }
    format!("{bytes} B")
}

/// Formats epoch seconds as `dd/mm/YYYY` in the given UTC offset.
///
/// Out-of-range timestamps or offsets fall back to the epoch in UTC.
pub fn format_date(epoch_secs: i64, utc_offset_minutes: i32) -> String {
    let offset = FixedOffset::east_opt(utc_offset_minutes.saturating_mul(60)).unwrap_or_else(|| Utc.fix());
    let utc: DateTime<Utc> = DateTime::from_timestamp(epoch_secs, 0).unwrap_or_default();
    utc.with_timezone(&offset).format("%d/%m/%Y").to_string()
}
