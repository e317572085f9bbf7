use crate::integration::support::{chain_snapshot, container, tag, GatedStore};
use notetree::store::{ChangeKind, MemoryRecordStore, RecordStore};
use notetree::{Listener, TreeCache};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn counting_listener() -> (Listener, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let listener: Listener = Arc::new(move |_: &TreeCache| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    (listener, hits)
}

#[tokio::test]
async fn container_change_notifies_once_after_rebuild_completes() {
    let store = Arc::new(GatedStore::new(chain_snapshot()));
    let cache = TreeCache::new(store.clone() as Arc<dyn RecordStore>);
    cache.init().await;
    let calls_after_init = store.container_calls();

    let (listener, hits) = counting_listener();
    cache.subscribe(listener);

    store.close();
    store.records.upsert_container(container("d", "D", None));
    store.wait_for_calls(calls_after_init + 1).await;

    // Rebuild is parked inside the store read
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(cache.root_count(), 1);

    store.release(1);
    cache.settled().await;
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(cache.project("/", 1, None).unwrap().labels(), vec!["A", "D"]);
}

#[tokio::test]
async fn listener_can_requery_the_cache() {
    let store = Arc::new(MemoryRecordStore::from_snapshot(chain_snapshot()));
    let cache = TreeCache::new(store.clone() as Arc<dyn RecordStore>);
    cache.init().await;

    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = seen.clone();
    cache.subscribe(Arc::new(move |cache: &TreeCache| {
        let forest = cache.project("/", 1, None).unwrap();
        sink.lock()
            .push(forest.labels().iter().map(|l| l.to_string()).collect::<Vec<_>>());
    }));

    store.upsert_container(container("e", "E", None));
    cache.settled().await;

    assert_eq!(*seen.lock(), vec![vec!["A".to_string(), "E".to_string()]]);
}

#[tokio::test]
async fn tag_change_refreshes_tags_without_notifying() {
    let store = Arc::new(MemoryRecordStore::from_snapshot(chain_snapshot()));
    let cache = TreeCache::new(store.clone() as Arc<dyn RecordStore>);
    cache.init().await;
    let (listener, hits) = counting_listener();
    cache.subscribe(listener);

    store.upsert_tag(tag("t1", "later"));
    cache.settled().await;

    assert_eq!(cache.tags().len(), 1);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unavailable_store_yields_empty_cache_until_next_signal() {
    let store = Arc::new(MemoryRecordStore::from_snapshot(chain_snapshot()));
    store.set_available(false);
    let cache = TreeCache::new(store.clone() as Arc<dyn RecordStore>);
    cache.init().await;

    assert!(cache.is_active());
    assert!(cache.project("/", 99, None).unwrap().is_empty());
    assert!(cache.tags().is_empty());

    store.set_available(true);
    store.touch(ChangeKind::Items);
    cache.settled().await;
    assert_eq!(cache.node_count(), 3);
}

#[tokio::test]
async fn duplicate_subscriptions_are_tracked_independently() {
    let store = Arc::new(MemoryRecordStore::from_snapshot(chain_snapshot()));
    let cache = TreeCache::new(store.clone() as Arc<dyn RecordStore>);
    cache.init().await;
    let (listener, hits) = counting_listener();

    cache.subscribe(listener.clone());
    cache.subscribe(listener.clone());
    store.touch(ChangeKind::Containers);
    cache.settled().await;
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    cache.unsubscribe(&listener);
    store.touch(ChangeKind::Containers);
    cache.settled().await;
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn teardown_stops_future_rebuilds() {
    let store = Arc::new(MemoryRecordStore::from_snapshot(chain_snapshot()));
    let cache = TreeCache::new(store.clone() as Arc<dyn RecordStore>);
    cache.init().await;
    let (listener, hits) = counting_listener();
    cache.subscribe(listener);

    cache.teardown();
    assert_eq!(store.listener_count(), 0);
    assert_eq!(cache.listener_count(), 0);

    store.upsert_container(container("z", "Z", None));
    cache.settled().await;
    assert_eq!(cache.root_count(), 0);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn teardown_discards_in_flight_rebuild() {
    let store = Arc::new(GatedStore::new(chain_snapshot()));
    let cache = TreeCache::new(store.clone() as Arc<dyn RecordStore>);
    cache.init().await;
    let calls = store.container_calls();

    store.close();
    store.records.upsert_container(container("late", "Late", None));
    store.wait_for_calls(calls + 1).await;

    cache.teardown();
    store.release(1);
    cache.settled().await;

    assert!(!cache.is_active());
    assert_eq!(cache.root_count(), 0);
}

#[tokio::test]
async fn init_after_teardown_reloads() {
    let store = Arc::new(MemoryRecordStore::from_snapshot(chain_snapshot()));
    let cache = TreeCache::new(store.clone() as Arc<dyn RecordStore>);
    cache.init().await;
    cache.teardown();

    cache.init().await;
    assert!(cache.is_active());
    assert_eq!(cache.node_count(), 3);
    assert_eq!(store.listener_count(), 3);

    store.upsert_container(container("n", "New", None));
    cache.settled().await;
    assert_eq!(cache.root_count(), 2);
}

#[tokio::test]
async fn teardown_drops_rerun_queued_behind_in_flight_rebuild() {
    let store = Arc::new(GatedStore::new(chain_snapshot()));
    let cache = TreeCache::new(store.clone() as Arc<dyn RecordStore>);
    cache.init().await;
    let calls = store.container_calls();

    store.close();
    store.records.upsert_container(container("late", "Late", None));
    store.wait_for_calls(calls + 1).await;
    store.records.upsert_container(container("later", "Later", None));

    cache.teardown();
    store.release(10);
    cache.settled().await;

    assert!(!cache.is_active());
    assert_eq!(cache.root_count(), 0);
    assert!(cache.project("/", 99, None).unwrap().is_empty());
    assert_eq!(store.container_calls(), calls + 1);
}

#[tokio::test]
async fn init_during_stale_rebuild_still_loads() {
    let store = Arc::new(GatedStore::new(chain_snapshot()));
    let cache = TreeCache::new(store.clone() as Arc<dyn RecordStore>);
    cache.init().await;
    let calls = store.container_calls();

    store.close();
    store.records.upsert_container(container("late", "Late", None));
    store.wait_for_calls(calls + 1).await;
    cache.teardown();

    let opener = {
        let store = store.clone();
        async move {
            store.wait_for_calls(calls + 1).await;
            store.release(10);
        }
    };
    tokio::join!(cache.init(), opener);

    assert!(cache.is_active());
    assert_eq!(cache.project("/", 1, None).unwrap().labels(), vec!["A", "Late"]);
}

#[tokio::test]
async fn deep_container_chain_loads_capped() {
    use notetree::store::RecordSnapshot;
    use notetree::tree::MAX_NESTING;

    let n = 5000;
    let containers = (0..n)
        .map(|i| {
            let parent = (i > 0).then(|| format!("c{}", i - 1));
            container(&format!("c{}", i), &format!("L{}", i), parent.as_deref())
        })
        .collect();
    let store = Arc::new(MemoryRecordStore::from_snapshot(RecordSnapshot {
        containers,
        items: vec![],
        tags: vec![],
    }));
    let cache = TreeCache::new(store as Arc<dyn RecordStore>);
    cache.init().await;

    assert_eq!(cache.node_count(), MAX_NESTING);
    assert_eq!(cache.last_build_stats().unreachable, n - MAX_NESTING);
    let projected = cache.project("/L0/L1", u32::MAX, Some("")).unwrap();
    assert_eq!(projected.node_count(), MAX_NESTING - 2);
}
