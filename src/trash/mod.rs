//! Deletion capture: content model, dedup window, entry store and logger.

pub mod clock;
pub mod content;
pub mod dedup;
pub mod entry;
pub mod format;
pub mod logger;
pub mod sanitize;
pub mod store;
