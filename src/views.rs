//! Tree Views
//!
//! Projects the cached forest into an independently owned, pruned copy:
//! resolve an absolute path against the unpruned forest, truncate container
//! nesting to a depth limit, then optionally keep only items matching a tag.
//! The source forest is only ever borrowed.

use crate::error::ApiError;
use crate::store::TagRecord;
use crate::tree::{ContainerNode, Forest, ItemNode, TreeNode};
use serde::{Deserialize, Serialize};

/// Depth used when a caller does not limit nesting
pub const UNLIMITED_DEPTH: u32 = u32::MAX;

/// Projection request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewPolicy {
    /// Absolute path of the subtree to show (`/` for the roots)
    pub path: String,
    /// Container levels whose children stay visible, queried level included
    pub depth: u32,
    /// Tag name filter; `Some("")` keeps only untagged items
    pub tag: Option<String>,
}

impl Default for ViewPolicy {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            depth: UNLIMITED_DEPTH,
            tag: None,
        }
    }
}

impl ViewPolicy {
    pub fn new(path: impl Into<String>, depth: u32) -> Self {
        Self {
            path: path.into(),
            depth,
            tag: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// Split an absolute path into label segments
///
/// A single trailing slash is ignored; `/` yields no segments.
pub fn split_path(path: &str) -> Result<Vec<&str>, ApiError> {
    let Some(rest) = path.strip_prefix('/') else {
        return Err(ApiError::InvalidPath(path.to_string()));
    };
    let mut segments: Vec<&str> = rest.split('/').collect();
    if segments.last().is_some_and(|s| s.is_empty()) {
        segments.pop();
    }
    Ok(segments)
}

/// Walk `segments` from `roots`, following the first label match at each level
///
/// Returns the children of the last matched node, or an empty slice when a
/// segment matches nothing.
pub fn resolve_path<'a>(roots: &'a [TreeNode], segments: &[&str]) -> &'a [TreeNode] {
    let mut current = roots;
    for segment in segments {
        current = current
            .iter()
            .find(|node| node.label() == *segment)
            .map(TreeNode::children)
            .unwrap_or(&[]);
    }
    current
}

/// Copy `nodes`, emptying container children below the depth limit
pub fn apply_depth(nodes: &[TreeNode], depth: u32) -> Vec<TreeNode> {
    nodes
        .iter()
        .map(|node| match node {
            TreeNode::Item(item) => TreeNode::Item(item.clone()),
            TreeNode::Container(container) => {
                let children = if depth <= 1 {
                    Vec::new()
                } else {
                    apply_depth(&container.children, depth - 1)
                };
                TreeNode::Container(ContainerNode {
                    id: container.id.clone(),
                    label: container.label.clone(),
                    parent_id: container.parent_id.clone(),
                    children,
                    record: container.record.clone(),
                })
            }
        })
        .collect()
}

/// Item predicate for a tag filter, resolved against the known tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMatcher {
    untagged: bool,
    tag_id: Option<String>,
}

impl TagMatcher {
    /// Resolve a tag name; an unknown name matches no item
    pub fn resolve(name: &str, tags: &[TagRecord]) -> Self {
        Self {
            untagged: name.is_empty(),
            tag_id: tags.iter().find(|t| t.name == name).map(|t| t.id.clone()),
        }
    }

    pub fn matches(&self, item: &ItemNode) -> bool {
        (self.untagged && item.tags().is_empty())
            || self.tag_id.as_deref().is_some_and(|id| item.has_tag(id))
    }
}

/// Drop non-matching items at every level; containers are always kept
pub fn apply_tag_filter(nodes: Vec<TreeNode>, matcher: &TagMatcher) -> Vec<TreeNode> {
    nodes
        .into_iter()
        .filter_map(|node| match node {
            TreeNode::Container(mut container) => {
                container.children =
                    apply_tag_filter(std::mem::take(&mut container.children), matcher);
                Some(TreeNode::Container(container))
            }
            TreeNode::Item(item) => matcher.matches(&item).then_some(TreeNode::Item(item)),
        })
        .collect()
}

/// Produce the projection described by `policy`
pub fn project(forest: &Forest, tags: &[TagRecord], policy: &ViewPolicy) -> Result<Forest, ApiError> {
    let segments = split_path(&policy.path)?;
    let subtree = resolve_path(&forest.roots, &segments);
    let mut nodes = apply_depth(subtree, policy.depth);
    if let Some(tag) = &policy.tag {
        nodes = apply_tag_filter(nodes, &TagMatcher::resolve(tag, tags));
    }
    Ok(Forest::new(nodes))
}
