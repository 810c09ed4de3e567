pub mod engine;
pub mod kv_record;
pub mod memtable;
