use crate::integration::support::{chain_snapshot, container, tag};
use notetree::store::{ChangeKind, FileRecordStore, RecordSnapshot, RecordStore};
use notetree::TreeCache;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn write(path: &Path, snapshot: &RecordSnapshot) {
    std::fs::write(path, serde_json::to_vec_pretty(snapshot).unwrap()).unwrap();
}

#[tokio::test]
async fn reload_rebuilds_only_what_changed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("records.json");
    let mut snapshot = chain_snapshot();
    write(&path, &snapshot);

    let store = Arc::new(FileRecordStore::open(&path));
    let cache = TreeCache::new(store.clone() as Arc<dyn RecordStore>);
    cache.init().await;
    assert_eq!(cache.node_count(), 3);

    snapshot.containers.push(container("q", "Q", None));
    write(&path, &snapshot);
    assert_eq!(store.reload().unwrap(), vec![ChangeKind::Containers]);
    cache.settled().await;
    assert_eq!(cache.project("/", 1, None).unwrap().labels(), vec!["A", "Q"]);

    snapshot.tags.push(tag("t1", "fresh"));
    write(&path, &snapshot);
    assert_eq!(store.reload().unwrap(), vec![ChangeKind::Tags]);
    cache.settled().await;
    assert_eq!(cache.tags().len(), 1);

    assert!(store.reload().unwrap().is_empty());
}

#[tokio::test]
async fn missing_snapshot_starts_empty_and_recovers() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("later.json");

    let store = Arc::new(FileRecordStore::open(&path));
    assert!(!store.is_loaded());
    let cache = TreeCache::new(store.clone() as Arc<dyn RecordStore>);
    cache.init().await;
    assert_eq!(cache.root_count(), 0);

    write(&path, &chain_snapshot());
    store.reload().unwrap();
    cache.settled().await;
    assert_eq!(cache.node_count(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn watched_snapshot_drives_rebuilds() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("records.json");
    let mut snapshot = chain_snapshot();
    write(&path, &snapshot);

    let store = Arc::new(FileRecordStore::open(&path));
    let cache = TreeCache::new(store.clone() as Arc<dyn RecordStore>);
    cache.init().await;
    store.watch(Duration::from_millis(50)).unwrap();

    snapshot.containers.push(container("w", "Watched", None));
    write(&path, &snapshot);

    let converged = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            cache.settled().await;
            if cache.root_count() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    })
    .await;
    store.unwatch();
    assert!(converged.is_ok(), "watcher never picked up the change");
    assert_eq!(cache.project("/", 1, None).unwrap().labels(), vec!["A", "Watched"]);
}

#[tokio::test]
async fn broken_snapshot_empties_the_cache() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("records.json");
    write(&path, &chain_snapshot());

    let store = Arc::new(FileRecordStore::open(&path));
    let cache = TreeCache::new(store.clone() as Arc<dyn RecordStore>);
    cache.init().await;
    assert_eq!(cache.node_count(), 3);

    std::fs::write(&path, "{ truncated").unwrap();
    assert!(store.reload().is_err());
    cache.settled().await;
    assert_eq!(cache.root_count(), 0);
    assert!(cache.tags().is_empty());

    write(&path, &chain_snapshot());
    store.reload().unwrap();
    cache.settled().await;
    assert_eq!(cache.node_count(), 3);
}
