//! Tree node types

use crate::store::{ContainerRecord, ItemRecord};
use crate::types::{NodeID, TagID};
use serde::{Serialize, Serializer};
use std::sync::Arc;

/// Discriminant of a [`TreeNode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Container,
    Item,
}

/// Container node: a grouping with ordered children
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerNode {
    pub id: NodeID,
    pub label: String,
    pub parent_id: Option<NodeID>,
    pub children: Vec<TreeNode>,
    #[serde(skip)]
    pub record: Arc<ContainerRecord>,
}

/// Item node: a leaf carrying its tag ids
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemNode {
    pub id: NodeID,
    pub label: String,
    pub parent_id: Option<NodeID>,
    #[serde(rename = "tags", serialize_with = "serialize_item_tags")]
    pub record: Arc<ItemRecord>,
}

/// Node in a forest
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    Container(ContainerNode),
    Item(ItemNode),
}

fn serialize_item_tags<S: Serializer>(
    record: &Arc<ItemRecord>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    record.tags.serialize(serializer)
}

impl ContainerNode {
    pub fn from_record(record: ContainerRecord) -> Self {
        Self {
            id: record.id.clone(),
            label: record.name.clone(),
            parent_id: record.parent_id.clone(),
            children: Vec::new(),
            record: Arc::new(record),
        }
    }
}

impl ItemNode {
    pub fn from_record(record: ItemRecord) -> Self {
        Self {
            id: record.id.clone(),
            label: record.title.clone(),
            parent_id: record.container_id.clone(),
            record: Arc::new(record),
        }
    }

    pub fn tags(&self) -> &[TagID] {
        &self.record.tags
    }

    pub fn has_tag(&self, tag_id: &str) -> bool {
        self.record.tags.iter().any(|t| t == tag_id)
    }
}

impl TreeNode {
    pub fn id(&self) -> &str {
        match self {
            TreeNode::Container(c) => &c.id,
            TreeNode::Item(i) => &i.id,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            TreeNode::Container(c) => &c.label,
            TreeNode::Item(i) => &i.label,
        }
    }

    pub fn parent_id(&self) -> Option<&str> {
        match self {
            TreeNode::Container(c) => c.parent_id.as_deref(),
            TreeNode::Item(i) => i.parent_id.as_deref(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            TreeNode::Container(_) => NodeKind::Container,
            TreeNode::Item(_) => NodeKind::Item,
        }
    }

    /// Children of a container; items have none
    pub fn children(&self) -> &[TreeNode] {
        match self {
            TreeNode::Container(c) => &c.children,
            TreeNode::Item(_) => &[],
        }
    }

    /// Number of nodes in this subtree, self included
    pub fn subtree_len(&self) -> usize {
        1 + self.children().iter().map(TreeNode::subtree_len).sum::<usize>()
    }
}

/// Forest: ordered root nodes and their descendants
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Forest {
    pub roots: Vec<TreeNode>,
}

impl Forest {
    pub fn new(roots: Vec<TreeNode>) -> Self {
        Self { roots }
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TreeNode> {
        self.roots.iter()
    }

    /// Total nodes at every level
    pub fn node_count(&self) -> usize {
        self.roots.iter().map(TreeNode::subtree_len).sum()
    }

    /// Every node id, depth-first in sibling order
    pub fn ids(&self) -> Vec<&str> {
        fn walk<'a>(nodes: &'a [TreeNode], out: &mut Vec<&'a str>) {
            for node in nodes {
                out.push(node.id());
                walk(node.children(), out);
            }
        }
        let mut out = Vec::new();
        walk(&self.roots, &mut out);
        out
    }

    /// Labels of the root level, in order
    pub fn labels(&self) -> Vec<&str> {
        self.roots.iter().map(TreeNode::label).collect()
    }
}

impl IntoIterator for Forest {
    type Item = TreeNode;
    type IntoIter = std::vec::IntoIter<TreeNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.roots.into_iter()
    }
}

impl<'a> IntoIterator for &'a Forest {
    type Item = &'a TreeNode;
    type IntoIter = std::slice::Iter<'a, TreeNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.roots.iter()
    }
}
