//! NoteTree: In-Memory Container/Item Tree Cache
//!
//! Builds a forest of containers and items from a record store, keeps it
//! current as the store signals changes, and serves path/depth/tag projections
//! of it to subscribers.

pub mod cache;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod logging;
pub mod render;
pub mod store;
pub mod tooling;
pub mod tree;
pub mod types;
pub mod views;

pub use cache::{Listener, TreeCache};
pub use error::{ApiError, StoreError};
pub use store::{RecordStore, RecordSnapshot};
pub use tree::{Forest, TreeNode};
pub use views::ViewPolicy;
