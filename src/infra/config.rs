use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::infra::error::{Result, TrashLogError};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrashLogConfig {
    pub store: StoreConfig,
    pub export: ExportConfig,
    pub capture: CaptureConfig,
    pub security: SecurityConfig,
}

/// Backing key-value store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub dir_path: PathBuf,
    /// WAL size at which the table is folded into a fresh snapshot.
    pub wal_compaction_bytes: u64,
}

/// CSV artifact location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Base upload directory. `None` means the host has no usable storage.
    pub upload_dir: Option<PathBuf>,
    pub csv_dir_name: String,
    pub csv_file_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub dedup_ttl_secs: u64,
    /// Offset applied when rendering `deletion_date`.
    pub utc_offset_minutes: i32,
    /// Keep dedup markers in the persistent store instead of process memory.
    pub persistent_markers: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// HMAC secret for action tokens. Generated and persisted when unset.
    pub secret: Option<String>,
    pub token_lifetime_secs: u64,
    /// Public base URL of the admin endpoints, used to build download links.
    pub base_url: String,
    /// Network (multi-site) install: only super admins may manage the log.
    pub network: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir_path: PathBuf::from("./.trash_log_data"),
            wal_compaction_bytes: 4 * 1024 * 1024,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            upload_dir: Some(PathBuf::from("./uploads")),
            csv_dir_name: "trash-log".to_string(),
            csv_file_name: "trash-log.csv".to_string(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            dedup_ttl_secs: 60,
            utc_offset_minutes: 0,
            persistent_markers: true,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            secret: None,
            token_lifetime_secs: 24 * 60 * 60,
            base_url: "http://127.0.0.1:8080".to_string(),
            network: false,
        }
    }
}

impl TrashLogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> TrashLogConfigBuilder {
        TrashLogConfigBuilder::default()
    }

    /// Overlays `TRASH_LOG_*` environment variables on the defaults.
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let mut builder = Self::builder();

        if let Ok(dir) = env::var("TRASH_LOG_DATA_DIR") {
            builder = builder.dir_path(dir);
        }
        if let Ok(dir) = env::var("TRASH_LOG_UPLOAD_DIR") {
            builder = builder.upload_dir(dir);
        }
        if let Ok(secret) = env::var("TRASH_LOG_SECRET") {
            builder = builder.secret(secret);
        }
        if let Ok(url) = env::var("TRASH_LOG_BASE_URL") {
            builder = builder.base_url(url);
        }

        builder
            .dedup_ttl_secs(env_parse("TRASH_LOG_DEDUP_TTL", defaults.capture.dedup_ttl_secs))
            .token_lifetime_secs(env_parse(
                "TRASH_LOG_TOKEN_LIFETIME",
                defaults.security.token_lifetime_secs,
            ))
            .network(env_parse("TRASH_LOG_NETWORK", defaults.security.network))
            .utc_offset_minutes(env_parse(
                "TRASH_LOG_UTC_OFFSET_MINUTES",
                defaults.capture.utc_offset_minutes,
            ))
            .wal_compaction_bytes(env_parse(
                "TRASH_LOG_WAL_COMPACT_BYTES",
                defaults.store.wal_compaction_bytes,
            ))
            .build()
    }

    pub fn csv_dir(&self) -> Option<PathBuf> {
        self.export
            .upload_dir
            .as_ref()
            .map(|base| base.join(&self.export.csv_dir_name))
    }

    pub fn validate(&self) -> Result<()> {
        if self.capture.dedup_ttl_secs == 0 {
            return Err(TrashLogError::ConfigValidation(
                "dedup_ttl_secs must be greater than zero".to_string(),
            ));
        }
        if self.security.token_lifetime_secs < 2 {
            return Err(TrashLogError::ConfigValidation(
                "token_lifetime_secs must be at least 2".to_string(),
            ));
        }
        if self.export.csv_file_name.is_empty()
            || self.export.csv_file_name.contains(['/', '\\'])
        {
            return Err(TrashLogError::ConfigValidation(format!(
                "invalid csv_file_name '{}'",
                self.export.csv_file_name
            )));
        }
        if self.export.csv_dir_name.is_empty() || self.export.csv_dir_name.contains("..") {
            return Err(TrashLogError::ConfigValidation(format!(
                "invalid csv_dir_name '{}'",
                self.export.csv_dir_name
            )));
        }
        if self.capture.utc_offset_minutes.unsigned_abs() >= 24 * 60 {
            return Err(TrashLogError::ConfigValidation(format!(
                "utc_offset_minutes out of range: {}",
                self.capture.utc_offset_minutes
            )));
        }
        if matches!(&self.security.secret, Some(s) if s.len() < 16) {
            return Err(TrashLogError::ConfigValidation(
                "secret must be at least 16 bytes".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[derive(Default)]
pub struct TrashLogConfigBuilder {
    dir_path: Option<PathBuf>,
    wal_compaction_bytes: Option<u64>,
    upload_dir: Option<Option<PathBuf>>,
    dedup_ttl_secs: Option<u64>,
    utc_offset_minutes: Option<i32>,
    persistent_markers: Option<bool>,
    secret: Option<String>,
    token_lifetime_secs: Option<u64>,
    base_url: Option<String>,
    network: Option<bool>,
}

impl TrashLogConfigBuilder {
    pub fn dir_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.dir_path = Some(path.into());
        self
    }

    pub fn wal_compaction_bytes(mut self, bytes: u64) -> Self {
        self.wal_compaction_bytes = Some(bytes);
        self
    }

    pub fn upload_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.upload_dir = Some(Some(path.into()));
        self
    }

    /// Simulates a host without a usable upload directory.
    pub fn without_upload_dir(mut self) -> Self {
        self.upload_dir = Some(None);
        self
    }

    pub fn dedup_ttl_secs(mut self, secs: u64) -> Self {
        self.dedup_ttl_secs = Some(secs);
        self
    }

    pub fn utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = Some(minutes);
        self
    }

    pub fn persistent_markers(mut self, enabled: bool) -> Self {
        self.persistent_markers = Some(enabled);
        self
    }

    pub fn secret<S: Into<String>>(mut self, secret: S) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn token_lifetime_secs(mut self, secs: u64) -> Self {
        self.token_lifetime_secs = Some(secs);
        self
    }

    pub fn base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn network(mut self, network: bool) -> Self {
        self.network = Some(network);
        self
    }

    pub fn build(self) -> TrashLogConfig {
        let defaults = TrashLogConfig::default();

        TrashLogConfig {
            store: StoreConfig {
                dir_path: self.dir_path.unwrap_or(defaults.store.dir_path),
                wal_compaction_bytes: self
                    .wal_compaction_bytes
                    .unwrap_or(defaults.store.wal_compaction_bytes),
            },
            export: ExportConfig {
                upload_dir: self.upload_dir.unwrap_or(defaults.export.upload_dir),
                ..defaults.export
            },
            capture: CaptureConfig {
                dedup_ttl_secs: self
                    .dedup_ttl_secs
                    .unwrap_or(defaults.capture.dedup_ttl_secs),
                utc_offset_minutes: self
                    .utc_offset_minutes
                    .unwrap_or(defaults.capture.utc_offset_minutes),
                persistent_markers: self
                    .persistent_markers
                    .unwrap_or(defaults.capture.persistent_markers),
            },
            security: SecurityConfig {
                secret: self.secret.or(defaults.security.secret),
                token_lifetime_secs: self
                    .token_lifetime_secs
                    .unwrap_or(defaults.security.token_lifetime_secs),
                base_url: self.base_url.unwrap_or(defaults.security.base_url),
                network: self.network.unwrap_or(defaults.security.network),
            },
        }
    }
}
