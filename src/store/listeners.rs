//! Change-listener registry shared by store implementations.

use super::{ChangeCallback, ChangeKind, Subscription};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

struct Registration {
    id: u64,
    kind: ChangeKind,
    callback: ChangeCallback,
}

/// Registry of change callbacks, keyed by collection
#[derive(Clone, Default)]
pub struct ChangeListeners {
    entries: Arc<RwLock<Vec<Registration>>>,
    next_id: Arc<AtomicU64>,
}

impl ChangeListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback; the returned handle removes it again
    pub fn subscribe(&self, kind: ChangeKind, callback: ChangeCallback) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.write().push(Registration { id, kind, callback });

        let entries = Arc::downgrade(&self.entries);
        Subscription::new(move || {
            if let Some(entries) = entries.upgrade() {
                entries.write().retain(|r| r.id != id);
            }
        })
    }

    /// Invoke every callback registered for `kind`
    ///
    /// Callbacks run without the registry lock held, so they may subscribe or
    /// release handles themselves.
    pub fn emit(&self, kind: ChangeKind) {
        let callbacks: Vec<ChangeCallback> = self
            .entries
            .read()
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| Arc::clone(&r.callback))
            .collect();
        for callback in callbacks {
            callback(kind);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
