use trash_log::{
    ContentCatalog, ContentDescriptor, KvEngine, LogEntry, ManualClock, RoleAuthorizer,
    StoreConfig, TrashLog, TrashLogConfig, TrashLogError,
};
use tempfile::tempdir;

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

fn config(root: &Path) -> TrashLogConfig {
    TrashLogConfig::builder()
        .dir_path(root.join("data"))
        .upload_dir(root.join("uploads"))
        .build()
}

fn open(config: TrashLogConfig, catalog: Arc<ContentCatalog>, clock: Arc<ManualClock>) -> TrashLog {
    TrashLog::open_with_clock(config, catalog, Arc::new(RoleAuthorizer::default()), clock).unwrap()
}

#[test]
fn entries_survive_restart() {
    let dir = tempdir().unwrap();
    let catalog = Arc::new(ContentCatalog::new());
    catalog.register(ContentDescriptor::new(1, "post").with_permalink("https://x/1"));
    catalog.register(ContentDescriptor::new(2, "page").with_permalink("https://x/2"));
    let clock = Arc::new(ManualClock::new(1_704_067_200));

    {
        let app = open(config(dir.path()), catalog.clone(), clock.clone());
        app.logger.on_trash(1, None).unwrap();
        app.logger.on_trash(2, None).unwrap();
    } // drop

    let app = open(config(dir.path()), catalog, clock);
    let entries = app.store.get_all().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].url, "https://x/1");
    assert_eq!(entries[1].deleted_item, "Page");
}

#[test]
fn dedup_markers_survive_restart() {
    let dir = tempdir().unwrap();
    let catalog = Arc::new(ContentCatalog::new());
    catalog.register(ContentDescriptor::new(7, "post"));
    let clock = Arc::new(ManualClock::new(1_000_000));

    {
        let app = open(config(dir.path()), catalog.clone(), clock.clone());
        app.logger.on_trash(7, None).unwrap();
    } // drop

    clock.advance(10);
    let app = open(config(dir.path()), catalog, clock);
    app.logger.on_trash(7, None).unwrap();
    assert_eq!(app.store.count().unwrap(), 1);
}

#[test]
fn purge_persists_across_restart() {
    let dir = tempdir().unwrap();
    let catalog = Arc::new(ContentCatalog::new());
    catalog.register(ContentDescriptor::new(1, "post"));
    let clock = Arc::new(ManualClock::new(0));

    {
        let app = open(config(dir.path()), catalog.clone(), clock.clone());
        app.logger.on_trash(1, None).unwrap();
        assert!(app.store.clear().unwrap());
    } // drop

    let app = open(config(dir.path()), catalog, clock);
    assert_eq!(app.store.count().unwrap(), 0);
}

#[test]
fn restart_after_compaction_reads_snapshot() {
    let dir = tempdir().unwrap();
    let cfg = StoreConfig {
        dir_path: dir.path().to_path_buf(),
        wal_compaction_bytes: 256,
    };

    {
        let engine = KvEngine::new(cfg.clone()).unwrap();
        for i in 0..50 {
            engine.set(format!("k{i}"), vec![b'x'; 20]).unwrap();
        }
        engine.delete("k3").unwrap();
    } // drop

    let engine = KvEngine::new(cfg).unwrap();
    assert_eq!(engine.get("k1").unwrap(), Some(vec![b'x'; 20]));
    assert!(engine.get("k3").unwrap().is_none());
    assert_eq!(engine.stats().unwrap().keys, 49);
}

#[test]
fn torn_wal_tail_keeps_earlier_entries() {
    let dir = tempdir().unwrap();
    let cfg = config(dir.path());
    let catalog = Arc::new(ContentCatalog::new());
    for id in 1..=3 {
        catalog.register(ContentDescriptor::new(id, "post"));
    }
    let clock = Arc::new(ManualClock::new(0));

    {
        let app = open(cfg.clone(), catalog.clone(), clock.clone());
        app.logger.on_trash(1, None).unwrap();
        app.logger.on_trash(2, None).unwrap();
    } // drop

    let wal_path = cfg.store.dir_path.join("wal.log");
    let file = OpenOptions::new().write(true).open(&wal_path).unwrap();
    let len = file.metadata().unwrap().len();
    assert!(len > 1);
    file.set_len(len - 1).unwrap(); // drop the last byte
    drop(file);

    {
        let app = open(cfg.clone(), catalog.clone(), clock.clone());
        assert_eq!(app.store.count().unwrap(), 2);
        app.logger.on_trash(3, None).unwrap();
    } // drop

    let app = open(cfg, catalog, clock);
    assert_eq!(app.store.count().unwrap(), 3);
}

#[test]
fn oversized_append_is_refused_and_directory_still_opens() {
    let dir = tempdir().unwrap();
    let cfg = TrashLogConfig::builder()
        .dir_path(dir.path().join("data"))
        .upload_dir(dir.path().join("uploads"))
        .wal_compaction_bytes(u64::MAX)
        .build();
    let catalog = Arc::new(ContentCatalog::new());
    catalog.register(ContentDescriptor::new(1, "post"));
    let clock = Arc::new(ManualClock::new(0));

    {
        let app = open(cfg.clone(), catalog.clone(), clock.clone());
        app.logger.on_trash(1, None).unwrap();

        let huge = LogEntry::new(&"a".repeat(33 * 1024 * 1024), "Post", "01/01/1970", "", "", 0);
        assert!(matches!(
            app.store.append(huge),
            Err(TrashLogError::RecordTooLarge { .. })
        ));
        assert_eq!(app.store.count().unwrap(), 1);
    } // drop

    let app = TrashLog::open(cfg, catalog, Arc::new(RoleAuthorizer::default())).unwrap();
    assert_eq!(app.store.count().unwrap(), 1);
}
