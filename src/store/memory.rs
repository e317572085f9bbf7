//! In-memory record store.
//!
//! Holds a [`RecordSnapshot`] behind a lock and emits change signals
//! synchronously after every mutation. Used for embedding and tests.

use super::{
    ChangeCallback, ChangeKind, ChangeListeners, ContainerRecord, ItemRecord, ListLimit,
    RecordSnapshot, RecordStore, Subscription, TagRecord,
};
use crate::error::StoreError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

pub struct MemoryRecordStore {
    snapshot: RwLock<RecordSnapshot>,
    available: AtomicBool,
    listeners: ChangeListeners,
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::from_snapshot(RecordSnapshot::default())
    }

    pub fn from_snapshot(snapshot: RecordSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
            available: AtomicBool::new(true),
            listeners: ChangeListeners::new(),
        }
    }

    /// Toggle availability; an unavailable store fails every list call
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> RecordSnapshot {
        self.snapshot.read().clone()
    }

    /// Insert or replace a container (matched by id)
    pub fn upsert_container(&self, record: ContainerRecord) {
        {
            let mut snapshot = self.snapshot.write();
            upsert_by(&mut snapshot.containers, record, |r| &r.id);
        }
        self.listeners.emit(ChangeKind::Containers);
    }

    pub fn remove_container(&self, id: &str) -> bool {
        let removed = remove_by(&mut self.snapshot.write().containers, id, |r| &r.id);
        if removed {
            self.listeners.emit(ChangeKind::Containers);
        }
        removed
    }

    /// Insert or replace an item (matched by id)
    pub fn upsert_item(&self, record: ItemRecord) {
        {
            let mut snapshot = self.snapshot.write();
            upsert_by(&mut snapshot.items, record, |r| &r.id);
        }
        self.listeners.emit(ChangeKind::Items);
    }

    pub fn remove_item(&self, id: &str) -> bool {
        let removed = remove_by(&mut self.snapshot.write().items, id, |r| &r.id);
        if removed {
            self.listeners.emit(ChangeKind::Items);
        }
        removed
    }

    /// Insert or replace a tag (matched by id)
    pub fn upsert_tag(&self, record: TagRecord) {
        {
            let mut snapshot = self.snapshot.write();
            upsert_by(&mut snapshot.tags, record, |r| &r.id);
        }
        self.listeners.emit(ChangeKind::Tags);
    }

    pub fn remove_tag(&self, id: &str) -> bool {
        let removed = remove_by(&mut self.snapshot.write().tags, id, |r| &r.id);
        if removed {
            self.listeners.emit(ChangeKind::Tags);
        }
        removed
    }

    /// Swap the whole snapshot and signal every collection
    pub fn replace(&self, snapshot: RecordSnapshot) {
        *self.snapshot.write() = snapshot;
        self.listeners.emit(ChangeKind::Containers);
        self.listeners.emit(ChangeKind::Items);
        self.listeners.emit(ChangeKind::Tags);
    }

    /// Emit a change signal without touching the data
    pub fn touch(&self, kind: ChangeKind) {
        self.listeners.emit(kind);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable(
                "memory store is marked unavailable".to_string(),
            ))
        }
    }
}

fn upsert_by<T>(records: &mut Vec<T>, record: T, key: impl Fn(&T) -> &String) {
    match records.iter().position(|r| key(r) == key(&record)) {
        Some(index) => records[index] = record,
        None => records.push(record),
    }
}

fn remove_by<T>(records: &mut Vec<T>, id: &str, key: impl Fn(&T) -> &String) -> bool {
    let before = records.len();
    records.retain(|r| key(r) != id);
    records.len() != before
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn list_containers(&self) -> Result<Vec<ContainerRecord>, StoreError> {
        self.ensure_available()?;
        Ok(self.snapshot.read().containers.clone())
    }

    async fn list_items(&self, limit: ListLimit) -> Result<Vec<ItemRecord>, StoreError> {
        self.ensure_available()?;
        Ok(limit.apply(self.snapshot.read().items.clone()))
    }

    async fn list_tags(&self) -> Result<Vec<TagRecord>, StoreError> {
        self.ensure_available()?;
        Ok(self.snapshot.read().tags.clone())
    }

    fn on_change(&self, kind: ChangeKind, callback: ChangeCallback) -> Subscription {
        self.listeners.subscribe(kind, callback)
    }
}
