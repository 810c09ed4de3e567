//! # Trash Log
//!
//! Records who deleted which piece of content, when, and (for media) how big
//! it was, then exports the history as a CSV file for administrators.
//!
//! ```text
//! ┌────────────────────┐
//! │ trash / delete hook│
//! └─────────┬──────────┘
//!           │
//!           ├─→ DedupGuard (60s marker per id)
//!           │
//!           ├─→ EventLogger (resolve + enrich) ──→ EntryStore
//!           │                                        │
//!           │                             KvEngine (WAL + snapshot) ──→ disk
//!           │
//!           └─→ AdminService ──→ CsvExporter ──→ uploads/trash-log/trash-log.csv
//! ```

pub mod admin;
pub mod app;
pub mod core;
pub mod export;
pub mod infra;
pub mod security;
pub mod storage;
pub mod trash;

#[cfg(feature = "api")]
pub mod api;

pub use admin::{ActionOutcome, AdminRequest, AdminService, StatusView};
pub use app::TrashLog;
pub use crate::core::engine::{KvEngine, KvStats};
pub use export::exporter::{CsvDownload, CsvExporter};
pub use infra::config::{
    CaptureConfig, ExportConfig, SecurityConfig, StoreConfig, TrashLogConfig,
    TrashLogConfigBuilder,
};
pub use infra::error::{Result, TrashLogError};
pub use security::auth::{Authorizer, RoleAuthorizer};
pub use security::token::{TokenAction, TokenIssuer};
pub use trash::clock::{Clock, ManualClock, SystemClock};
pub use trash::content::{
    Actor, ContentCatalog, ContentDescriptor, ContentId, ContentResolver, MediaInfo, Role,
};
pub use trash::entry::{LogEntry, AUTOMATIC_ACTION};
pub use trash::logger::{CaptureOutcome, EventLogger};
pub use trash::store::EntryStore;
