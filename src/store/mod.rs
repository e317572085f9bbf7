//! Record Store
//!
//! Contract for the host collaborator that owns the flat container, item and
//! tag collections and signals when any of them changes. The tree cache only
//! ever talks to a store through [`RecordStore`].

pub mod file;
pub mod listeners;
pub mod memory;

use crate::error::StoreError;
use crate::types::{NodeID, TagID};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use file::FileRecordStore;
pub use listeners::ChangeListeners;
pub use memory::MemoryRecordStore;

/// Page size applied by stores when the caller does not ask for everything
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// ContainerRecord: a grouping record that may parent containers and items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRecord {
    pub id: NodeID,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<NodeID>,
}

/// ItemRecord: a stored document, optionally filed under a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: NodeID,
    pub title: String,
    #[serde(default)]
    pub container_id: Option<NodeID>,
    #[serde(default)]
    pub tags: Vec<TagID>,
}

/// TagRecord: sourced verbatim from the store's tag collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub id: TagID,
    pub name: String,
}

/// Full contents of a store at one point in time (also the JSON file format)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    #[serde(default)]
    pub containers: Vec<ContainerRecord>,
    #[serde(default)]
    pub items: Vec<ItemRecord>,
    #[serde(default)]
    pub tags: Vec<TagRecord>,
}

/// Result size requested from `list_items`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListLimit {
    Page(usize),
    Unbounded,
}

impl Default for ListLimit {
    fn default() -> Self {
        ListLimit::Page(DEFAULT_PAGE_SIZE)
    }
}

impl ListLimit {
    /// Truncate a collection to this limit
    pub fn apply<T>(self, mut records: Vec<T>) -> Vec<T> {
        if let ListLimit::Page(size) = self {
            records.truncate(size);
        }
        records
    }
}

/// Which collection a change signal refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Containers,
    Items,
    Tags,
}

/// Callback invoked synchronously when a collection changes
pub type ChangeCallback = Arc<dyn Fn(ChangeKind) + Send + Sync>;

/// Disposable handle for a change-stream registration
///
/// Releasing (explicitly or by drop) unregisters the callback.
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A handle with nothing to release
    pub fn noop() -> Self {
        Self { release: None }
    }

    pub fn release(mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

/// Record store interface
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list_containers(&self) -> Result<Vec<ContainerRecord>, StoreError>;
    async fn list_items(&self, limit: ListLimit) -> Result<Vec<ItemRecord>, StoreError>;
    async fn list_tags(&self) -> Result<Vec<TagRecord>, StoreError>;

    /// Register a callback for one collection's change stream
    fn on_change(&self, kind: ChangeKind, callback: ChangeCallback) -> Subscription;

    fn on_container_change(&self, callback: ChangeCallback) -> Subscription {
        self.on_change(ChangeKind::Containers, callback)
    }

    fn on_item_change(&self, callback: ChangeCallback) -> Subscription {
        self.on_change(ChangeKind::Items, callback)
    }

    fn on_tag_change(&self, callback: ChangeCallback) -> Subscription {
        self.on_change(ChangeKind::Tags, callback)
    }
}
