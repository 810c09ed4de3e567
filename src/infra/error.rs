use std::io;
use thiserror::Error;

/// Every failure the crate can report.
///
/// The `Display` text of the domain variants is what gets shown to the
/// administrator, so keep it short and human-readable.
#[derive(Error, Debug)]
pub enum TrashLogError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(&'static str),

    #[error("WAL corruption detected")]
    WalCorruption,

    #[error("Record too large: {size} bytes (limit {limit})")]
    RecordTooLarge { size: usize, limit: usize },

    #[error("Snapshot corruption detected: {0}")]
    SnapshotCorruption(String),

    #[error("Configuration validation failed: {0}")]
    ConfigValidation(String),

    // Export
    #[error("No log entries found.")]
    NoEntries,

    #[error("Unable to access upload directory.")]
    StorageUnavailable,

    #[error("Failed to create CSV directory: {0}")]
    DirectoryCreateFailed(String),

    #[error("Failed to write CSV file: {0}")]
    FileWriteFailed(String),

    #[error("CSV file not found.")]
    FileNotFound,

    #[error("Failed to delete CSV file: {0}")]
    DeleteFailed(String),

    // Admin boundary
    #[error("Security check failed.")]
    SecurityCheckFailed,

    #[error("You do not have permission to perform this action.")]
    PermissionDenied,

    #[error("You must be logged in to access this file.")]
    NotLoggedIn,

    #[error("Failed to purge log entries.")]
    PurgeFailed,
}

impl TrashLogError {
    /// True for the errors raised by the admin boundary before any work runs.
    pub fn is_access_denied(&self) -> bool {
        matches!(
            self,
            TrashLogError::SecurityCheckFailed
                | TrashLogError::PermissionDenied
                | TrashLogError::NotLoggedIn
        )
    }
}

pub type Result<T> = std::result::Result<T, TrashLogError>;
