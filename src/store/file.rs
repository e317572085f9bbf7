//! File-backed record store.
//!
//! Loads a JSON [`RecordSnapshot`] from disk and, when watching, reloads it on
//! change and signals only the collections whose contents differ.

use super::{
    ChangeCallback, ChangeKind, ChangeListeners, ContainerRecord, ItemRecord, ListLimit,
    RecordSnapshot, RecordStore, Subscription, TagRecord,
};
use crate::error::StoreError;
use async_trait::async_trait;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::time::Duration;
use tracing::{debug, error, info, warn};

struct FileStoreInner {
    path: PathBuf,
    snapshot: RwLock<Option<RecordSnapshot>>,
    listeners: ChangeListeners,
}

pub struct FileRecordStore {
    inner: Arc<FileStoreInner>,
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl FileRecordStore {
    /// Open a snapshot file
    ///
    /// A missing or unreadable file leaves the store unavailable rather than
    /// failing; a later `reload` can bring it up.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let snapshot = match read_snapshot(&path) {
            Ok(snapshot) => {
                info!(
                    path = %path.display(),
                    containers = snapshot.containers.len(),
                    items = snapshot.items.len(),
                    tags = snapshot.tags.len(),
                    "Loaded record snapshot"
                );
                Some(snapshot)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Snapshot not loaded");
                None
            }
        };

        Self {
            inner: Arc::new(FileStoreInner {
                path,
                snapshot: RwLock::new(snapshot),
                listeners: ChangeListeners::new(),
            }),
            watcher: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.snapshot.read().is_some()
    }

    /// Re-read the file and emit change signals for the collections that changed
    ///
    /// A missing or invalid file unloads the snapshot and signals every
    /// collection, so dependents rebuild against an unavailable store.
    pub fn reload(&self) -> Result<Vec<ChangeKind>, StoreError> {
        self.inner.reload()
    }

    /// Start watching the snapshot file, reloading after `debounce` of quiet
    pub fn watch(&self, debounce: Duration) -> Result<(), StoreError> {
        let mut slot = self.watcher.lock();
        if slot.is_some() {
            return Ok(());
        }

        let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
        let mut watcher = notify::recommended_watcher(move |res| {
            if let Err(e) = tx.send(res) {
                error!("Error sending watch event: {}", e);
            }
        })
        .map_err(|e| StoreError::Watch(format!("Failed to create watcher: {}", e)))?;

        // Editors often save by atomic rename, so watch the directory.
        let dir = match self.inner.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| StoreError::Watch(format!("Failed to watch directory: {}", e)))?;

        let inner = Arc::clone(&self.inner);
        std::thread::Builder::new()
            .name("notetree-snapshot-watch".to_string())
            .spawn(move || watch_loop(inner, rx, debounce))?;

        info!(path = %self.inner.path.display(), "Watching record snapshot");
        *slot = Some(watcher);
        Ok(())
    }

    /// Stop watching; the watch thread exits once its channel closes
    pub fn unwatch(&self) {
        if self.watcher.lock().take().is_some() {
            debug!(path = %self.inner.path.display(), "Stopped watching record snapshot");
        }
    }

    fn current(&self) -> Result<RecordSnapshot, StoreError> {
        self.inner.snapshot.read().clone().ok_or_else(|| {
            StoreError::Unavailable(format!(
                "snapshot {} is not loaded",
                self.inner.path.display()
            ))
        })
    }
}

impl FileStoreInner {
    fn reload(&self) -> Result<Vec<ChangeKind>, StoreError> {
        let fresh = match read_snapshot(&self.path) {
            Ok(fresh) => fresh,
            Err(e) => {
                self.unload();
                return Err(e);
            }
        };
        let changed = {
            let mut slot = self.snapshot.write();
            let changed = match slot.as_ref() {
                Some(old) => changed_kinds(old, &fresh),
                None => vec![ChangeKind::Containers, ChangeKind::Items, ChangeKind::Tags],
            };
            *slot = Some(fresh);
            changed
        };

        debug!(path = %self.path.display(), changed = ?changed, "Reloaded record snapshot");
        for kind in &changed {
            self.listeners.emit(*kind);
        }
        Ok(changed)
    }

    /// Drop the loaded snapshot; readers see the store as unavailable
    fn unload(&self) {
        if self.snapshot.write().take().is_none() {
            return;
        }
        warn!(path = %self.path.display(), "Snapshot missing or invalid, store unavailable");
        for kind in [ChangeKind::Containers, ChangeKind::Items, ChangeKind::Tags] {
            self.listeners.emit(kind);
        }
    }

    fn is_relevant(&self, event: &Event) -> bool {
        let relevant_kind = matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
        );
        let file_name = self.path.file_name();
        relevant_kind && event.paths.iter().any(|p| p.file_name() == file_name)
    }
}

fn watch_loop(
    inner: Arc<FileStoreInner>,
    rx: mpsc::Receiver<notify::Result<Event>>,
    debounce: Duration,
) {
    loop {
        match rx.recv() {
            Ok(Ok(event)) if inner.is_relevant(&event) => {}
            Ok(Ok(_)) => continue,
            Ok(Err(e)) => {
                warn!("Watch error: {}", e);
                continue;
            }
            Err(_) => break,
        }

        // Swallow the burst of events a single save produces.
        loop {
            match rx.recv_timeout(debounce) {
                Ok(_) => continue,
                Err(mpsc::RecvTimeoutError::Timeout) => break,
                Err(mpsc::RecvTimeoutError::Disconnected) => return,
            }
        }

        if let Err(e) = inner.reload() {
            warn!(path = %inner.path.display(), error = %e, "Snapshot reload failed");
        }
    }
    debug!("Snapshot watch loop finished");
}

fn read_snapshot(path: &Path) -> Result<RecordSnapshot, StoreError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn changed_kinds(old: &RecordSnapshot, new: &RecordSnapshot) -> Vec<ChangeKind> {
    let mut changed = Vec::new();
    if old.containers != new.containers {
        changed.push(ChangeKind::Containers);
    }
    if old.items != new.items {
        changed.push(ChangeKind::Items);
    }
    if old.tags != new.tags {
        changed.push(ChangeKind::Tags);
    }
    changed
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn list_containers(&self) -> Result<Vec<ContainerRecord>, StoreError> {
        Ok(self.current()?.containers)
    }

    async fn list_items(&self, limit: ListLimit) -> Result<Vec<ItemRecord>, StoreError> {
        Ok(limit.apply(self.current()?.items))
    }

    async fn list_tags(&self) -> Result<Vec<TagRecord>, StoreError> {
        Ok(self.current()?.tags)
    }

    fn on_change(&self, kind: ChangeKind, callback: ChangeCallback) -> Subscription {
        self.inner.listeners.subscribe(kind, callback)
    }
}
