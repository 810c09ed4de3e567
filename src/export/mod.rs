pub mod exporter;
pub mod htaccess;
