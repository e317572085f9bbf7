//! Tree Cache
//!
//! Owns the current forest and tag set built from a [`RecordStore`], rebuilds
//! them when the store signals a change, notifies subscribers after every tree
//! rebuild and answers projection queries with independent copies.
//!
//! Rebuilds go through a [`SingleFlight`] gate per target, so a burst of
//! change signals produces one in-flight rebuild plus at most one queued rerun.

use crate::concurrency::SingleFlight;
use crate::error::ApiError;
use crate::store::{ChangeCallback, ChangeKind, ListLimit, RecordStore, Subscription, TagRecord};
use crate::tree::{BuildStats, BuiltTree, Forest, TreeBuilder};
use crate::views::{self, ViewPolicy};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

/// Subscriber callback, invoked with the cache after each tree rebuild
pub type Listener = Arc<dyn Fn(&TreeCache) + Send + Sync>;

/// What a rebuild refreshes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RebuildTarget {
    Tree,
    Tags,
}

impl From<ChangeKind> for RebuildTarget {
    fn from(kind: ChangeKind) -> Self {
        match kind {
            ChangeKind::Containers | ChangeKind::Items => RebuildTarget::Tree,
            ChangeKind::Tags => RebuildTarget::Tags,
        }
    }
}

struct CacheInner {
    store: Arc<dyn RecordStore>,
    forest: RwLock<Forest>,
    tags: RwLock<Vec<TagRecord>>,
    stats: RwLock<BuildStats>,
    listeners: RwLock<Vec<Listener>>,
    subscriptions: Mutex<Vec<Subscription>>,
    runtime: RwLock<Option<Handle>>,
    tree_flight: SingleFlight,
    tag_flight: SingleFlight,
    active: AtomicBool,
    /// Bumped on teardown; rebuilds started under an older epoch are discarded
    epoch: AtomicU64,
}

/// Handle to a tree cache; clones share the same state
#[derive(Clone)]
pub struct TreeCache {
    inner: Arc<CacheInner>,
}

impl TreeCache {
    /// Create an inert cache over `store`; call [`TreeCache::init`] to load it
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                store,
                forest: RwLock::new(Forest::default()),
                tags: RwLock::new(Vec::new()),
                stats: RwLock::new(BuildStats::default()),
                listeners: RwLock::new(Vec::new()),
                subscriptions: Mutex::new(Vec::new()),
                runtime: RwLock::new(None),
                tree_flight: SingleFlight::new(),
                tag_flight: SingleFlight::new(),
                active: AtomicBool::new(false),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Subscribe to the store's change streams and load tags and tree
    ///
    /// Returns once both initial rebuilds have completed. Calling `init` on an
    /// active cache is a no-op.
    pub async fn init(&self) {
        if self.inner.active.swap(true, Ordering::SeqCst) {
            warn!("Tree cache already initialized");
            return;
        }

        let runtime = Handle::try_current().ok();
        if runtime.is_none() {
            warn!("No tokio runtime available; change signals will be ignored");
        }
        *self.inner.runtime.write() = runtime;

        let weak = Arc::downgrade(&self.inner);
        let callback: ChangeCallback = Arc::new(move |kind| {
            if let Some(inner) = weak.upgrade() {
                inner.schedule(RebuildTarget::from(kind));
            }
        });
        {
            let store = &self.inner.store;
            let mut subscriptions = self.inner.subscriptions.lock();
            subscriptions.push(store.on_container_change(Arc::clone(&callback)));
            subscriptions.push(store.on_item_change(Arc::clone(&callback)));
            subscriptions.push(store.on_tag_change(callback));
        }

        tokio::join!(self.rebuild_tags(), self.rebuild_tree());

        info!(
            roots = self.inner.forest.read().len(),
            tags = self.inner.tags.read().len(),
            "Tree cache initialized"
        );
    }

    /// Rebuild the forest from the store and notify subscribers
    ///
    /// If a rebuild is already running this queues one rerun instead; either
    /// way it returns after the tree reflects a rebuild started no earlier
    /// than this call.
    pub async fn rebuild_tree(&self) {
        self.inner.drive(RebuildTarget::Tree).await;
    }

    /// Reload the tag set from the store (subscribers are not notified)
    pub async fn rebuild_tags(&self) {
        self.inner.drive(RebuildTarget::Tags).await;
    }

    /// Drop cached state and release the store subscriptions
    ///
    /// A rebuild already in flight runs to completion but its result is
    /// discarded, and any rerun queued behind it is dropped. The cache stays
    /// inert until `init` is called again.
    pub fn teardown(&self) {
        let was_active = self.inner.active.swap(false, Ordering::SeqCst);
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);

        let subscriptions = std::mem::take(&mut *self.inner.subscriptions.lock());
        for subscription in subscriptions {
            subscription.release();
        }
        // Reruns queued by earlier signals must not outlive the teardown.
        let dropped = self.inner.tree_flight.cancel_queued() | self.inner.tag_flight.cancel_queued();
        if dropped {
            debug!("Dropped queued rebuild on teardown");
        }
        *self.inner.runtime.write() = None;
        *self.inner.forest.write() = Forest::default();
        *self.inner.stats.write() = BuildStats::default();
        self.inner.tags.write().clear();
        self.inner.listeners.write().clear();

        if was_active {
            info!("Tree cache torn down");
        }
    }

    /// Register a listener; registering the same listener twice calls it twice
    pub fn subscribe(&self, listener: Listener) {
        self.inner.listeners.write().push(listener);
    }

    /// Remove one registration of `listener` (matched by identity)
    pub fn unsubscribe(&self, listener: &Listener) -> bool {
        let mut listeners = self.inner.listeners.write();
        match listeners.iter().position(|l| Arc::ptr_eq(l, listener)) {
            Some(index) => {
                listeners.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.read().len()
    }

    /// Project the subtree at `path`, limited to `depth` levels and filtered by `tag`
    pub fn project(&self, path: &str, depth: u32, tag: Option<&str>) -> Result<Forest, ApiError> {
        let policy = ViewPolicy {
            path: path.to_string(),
            depth,
            tag: tag.map(str::to_string),
        };
        self.project_view(&policy)
    }

    pub fn project_view(&self, policy: &ViewPolicy) -> Result<Forest, ApiError> {
        let forest = self.inner.forest.read();
        let tags = self.inner.tags.read();
        views::project(&forest, &tags, policy)
    }

    /// Copy of the current tag set
    pub fn tags(&self) -> Vec<TagRecord> {
        self.inner.tags.read().clone()
    }

    pub fn root_count(&self) -> usize {
        self.inner.forest.read().len()
    }

    pub fn node_count(&self) -> usize {
        self.inner.forest.read().node_count()
    }

    /// Stats of the last installed tree build
    pub fn last_build_stats(&self) -> BuildStats {
        *self.inner.stats.read()
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Wait until no tree or tag rebuild is running or queued
    pub async fn settled(&self) {
        self.inner.tree_flight.wait_idle().await;
        self.inner.tag_flight.wait_idle().await;
    }
}

impl CacheInner {
    fn flight(&self, target: RebuildTarget) -> &SingleFlight {
        match target {
            RebuildTarget::Tree => &self.tree_flight,
            RebuildTarget::Tags => &self.tag_flight,
        }
    }

    /// Change-signal entry point; may be called from any thread
    fn schedule(self: &Arc<Self>, target: RebuildTarget) {
        let epoch = self.epoch.load(Ordering::SeqCst);
        if !self.active.load(Ordering::SeqCst) {
            return;
        }
        let Some(runtime) = self.runtime.read().clone() else {
            return;
        };
        if !self.flight(target).try_begin() {
            if !self.active.load(Ordering::SeqCst) {
                // Torn down between the check above and the queueing
                self.flight(target).cancel_queued();
                return;
            }
            debug!(target = ?target, "Rebuild already in flight, queued rerun");
            return;
        }
        let inner = Arc::clone(self);
        runtime.spawn(async move {
            inner.run_flight(target, epoch).await;
        });
    }

    async fn drive(self: &Arc<Self>, target: RebuildTarget) {
        let epoch = self.epoch.load(Ordering::SeqCst);
        if self.flight(target).try_begin() {
            self.run_flight(target, epoch).await;
        } else {
            debug!(target = ?target, "Rebuild already in flight, queued rerun");
            self.flight(target).wait_idle().await;
        }
    }

    /// Run rebuilds until the gate reports no queued rerun
    ///
    /// The first run belongs to the epoch it was requested in; a rerun belongs
    /// to the epoch current when it starts, unless the cache was torn down
    /// meanwhile, in which case queued reruns are dropped.
    async fn run_flight(self: &Arc<Self>, target: RebuildTarget, requested: u64) {
        let mut epoch = requested;
        loop {
            match target {
                RebuildTarget::Tree => self.rebuild_tree_once(epoch).await,
                RebuildTarget::Tags => self.rebuild_tags_once(epoch).await,
            }
            if !self.flight(target).complete() {
                break;
            }
            let current = self.epoch.load(Ordering::SeqCst);
            if current != epoch && !self.active.load(Ordering::SeqCst) {
                debug!(target = ?target, "Dropping rerun queued before teardown");
                while self.flight(target).complete() {}
                break;
            }
            epoch = current;
        }
    }

    async fn rebuild_tree_once(self: &Arc<Self>, epoch: u64) {
        let (containers, items) = tokio::join!(
            self.store.list_containers(),
            self.store.list_items(ListLimit::Unbounded)
        );
        let built = match (containers, items) {
            (Ok(containers), Ok(items)) => TreeBuilder::new(containers, items).build(),
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "Record store unavailable, using empty tree");
                BuiltTree::default()
            }
        };

        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!("Discarding tree rebuild started before teardown");
            return;
        }
        debug!(
            roots = built.forest.len(),
            nodes = built.stats.attached,
            "Installing rebuilt tree"
        );
        *self.forest.write() = built.forest;
        *self.stats.write() = built.stats;

        let listeners: Vec<Listener> = self.listeners.read().clone();
        if listeners.is_empty() {
            return;
        }
        let cache = TreeCache {
            inner: Arc::clone(self),
        };
        for listener in listeners {
            listener(&cache);
        }
    }

    async fn rebuild_tags_once(&self, epoch: u64) {
        let tags = match self.store.list_tags().await {
            Ok(tags) => tags,
            Err(e) => {
                warn!(error = %e, "Record store unavailable, using empty tag set");
                Vec::new()
            }
        };

        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!("Discarding tag rebuild started before teardown");
            return;
        }
        debug!(tags = tags.len(), "Installing rebuilt tag set");
        *self.tags.write() = tags;
    }
}
