pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
