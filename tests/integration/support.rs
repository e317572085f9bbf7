//! Shared fixtures: record constructors and a store whose container reads can be held open.

use async_trait::async_trait;
use notetree::error::StoreError;
use notetree::store::{
    ChangeCallback, ChangeKind, ContainerRecord, ItemRecord, ListLimit, MemoryRecordStore,
    RecordSnapshot, RecordStore, Subscription, TagRecord,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;

pub fn container(id: &str, name: &str, parent: Option<&str>) -> ContainerRecord {
    ContainerRecord {
        id: id.to_string(),
        name: name.to_string(),
        parent_id: parent.map(str::to_string),
    }
}

pub fn item(id: &str, title: &str, parent: Option<&str>, tags: &[&str]) -> ItemRecord {
    ItemRecord {
        id: id.to_string(),
        title: title.to_string(),
        container_id: parent.map(str::to_string),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

pub fn tag(id: &str, name: &str) -> TagRecord {
    TagRecord {
        id: id.to_string(),
        name: name.to_string(),
    }
}

/// A contains B contains item C
pub fn chain_snapshot() -> RecordSnapshot {
    RecordSnapshot {
        containers: vec![container("a", "A", None), container("b", "B", Some("a"))],
        items: vec![item("c", "C", Some("b"), &[])],
        tags: vec![],
    }
}

/// A contains X (tagged work) and Y (untagged)
pub fn tagged_snapshot() -> RecordSnapshot {
    RecordSnapshot {
        containers: vec![container("a", "A", None)],
        items: vec![
            item("x", "X", Some("a"), &["t-work"]),
            item("y", "Y", Some("a"), &[]),
        ],
        tags: vec![tag("t-work", "work")],
    }
}

/// Memory store whose `list_containers` can be made to wait for a permit
pub struct GatedStore {
    pub records: MemoryRecordStore,
    gate: Semaphore,
    gated: AtomicBool,
    container_calls: AtomicUsize,
}

impl GatedStore {
    pub fn new(snapshot: RecordSnapshot) -> Self {
        Self {
            records: MemoryRecordStore::from_snapshot(snapshot),
            gate: Semaphore::new(0),
            gated: AtomicBool::new(false),
            container_calls: AtomicUsize::new(0),
        }
    }

    /// Hold container reads until permits are released
    pub fn close(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }

    /// Let `n` held or future container reads through
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    pub fn container_calls(&self) -> usize {
        self.container_calls.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` container reads have started
    pub async fn wait_for_calls(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.container_calls() < n {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("container read never started");
    }
}

#[async_trait]
impl RecordStore for GatedStore {
    async fn list_containers(&self) -> Result<Vec<ContainerRecord>, StoreError> {
        self.container_calls.fetch_add(1, Ordering::SeqCst);
        if self.gated.load(Ordering::SeqCst) {
            let permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            permit.forget();
        }
        self.records.list_containers().await
    }

    async fn list_items(&self, limit: ListLimit) -> Result<Vec<ItemRecord>, StoreError> {
        self.records.list_items(limit).await
    }

    async fn list_tags(&self) -> Result<Vec<TagRecord>, StoreError> {
        self.records.list_tags().await
    }

    fn on_change(&self, kind: ChangeKind, callback: ChangeCallback) -> Subscription {
        self.records.on_change(kind, callback)
    }
}
