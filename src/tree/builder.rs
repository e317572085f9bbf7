//! Tree builder: flat container and item records to an ordered forest.
//!
//! Ordering contract: at every level child containers come first, then child
//! items, each group sorted by label with a stable sort (equal labels keep
//! their input order). Nodes whose parent is not a known container are
//! dropped; nodes that are never reachable from a root (parent cycles) are
//! dropped as well.
//!
//! Nesting is capped at [`MAX_NESTING`] levels: a container at the deepest
//! allowed level keeps no children, and everything below it is counted as
//! unreachable. Every pass over a forest recurses per level, so the cap bounds
//! stack use for any input.

use super::node::{ContainerNode, Forest, ItemNode, TreeNode};
use crate::store::{ContainerRecord, ItemRecord};
use crate::types::NodeID;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Deepest level a node may sit at; roots are level 1
pub const MAX_NESTING: usize = 256;

/// Counters describing one build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Container records received
    pub containers: usize,
    /// Item records received
    pub items: usize,
    /// Nodes present in the resulting forest
    pub attached: usize,
    /// Nodes dropped because their parent is not a known container
    pub dangling: usize,
    /// Records dropped because their id was already taken
    pub duplicates: usize,
    /// Nodes with a valid parent that no root leads to (parent cycles, or
    /// nesting deeper than [`MAX_NESTING`])
    pub unreachable: usize,
}

/// Result of a build
#[derive(Debug, Clone, Default)]
pub struct BuiltTree {
    pub forest: Forest,
    pub stats: BuildStats,
}

pub struct TreeBuilder {
    containers: Vec<ContainerRecord>,
    items: Vec<ItemRecord>,
}

impl TreeBuilder {
    pub fn new(containers: Vec<ContainerRecord>, items: Vec<ItemRecord>) -> Self {
        Self { containers, items }
    }

    pub fn build(self) -> BuiltTree {
        let mut stats = BuildStats {
            containers: self.containers.len(),
            items: self.items.len(),
            ..BuildStats::default()
        };

        // First record wins an id; containers claim ids before items.
        let mut taken: HashSet<NodeID> = HashSet::new();
        let mut containers: Vec<ContainerNode> = Vec::with_capacity(self.containers.len());
        for record in self.containers {
            if taken.insert(record.id.clone()) {
                containers.push(ContainerNode::from_record(record));
            } else {
                debug!(id = %record.id, "Dropping container with duplicate id");
                stats.duplicates += 1;
            }
        }
        let mut items: Vec<ItemNode> = Vec::with_capacity(self.items.len());
        for record in self.items {
            if taken.insert(record.id.clone()) {
                items.push(ItemNode::from_record(record));
            } else {
                debug!(id = %record.id, "Dropping item with duplicate id");
                stats.duplicates += 1;
            }
        }

        containers.sort_by(|a, b| a.label.cmp(&b.label));
        items.sort_by(|a, b| a.label.cmp(&b.label));

        let container_ids: HashSet<NodeID> = containers.iter().map(|c| c.id.clone()).collect();
        let nodes: Vec<TreeNode> = containers
            .into_iter()
            .map(TreeNode::Container)
            .chain(items.into_iter().map(TreeNode::Item))
            .collect();

        let mut roots: Vec<usize> = Vec::new();
        let mut children_of: HashMap<NodeID, Vec<usize>> = HashMap::new();
        for (index, node) in nodes.iter().enumerate() {
            match node.parent_id() {
                None => roots.push(index),
                Some(parent) if container_ids.contains(parent) => {
                    children_of.entry(parent.to_string()).or_default().push(index);
                }
                Some(parent) => {
                    debug!(id = %node.id(), parent = %parent, "Dropping node with dangling parent");
                    stats.dangling += 1;
                }
            }
        }

        let total = nodes.len();
        let mut slots: Vec<Option<TreeNode>> = nodes.into_iter().map(Some).collect();
        let forest_roots: Vec<TreeNode> = roots
            .iter()
            .filter_map(|&index| assemble(index, 1, &mut slots, &children_of, &mut stats.attached))
            .collect();

        stats.unreachable = total - stats.dangling - stats.attached;
        if stats.unreachable > 0 {
            warn!(
                unreachable = stats.unreachable,
                max_nesting = MAX_NESTING,
                "Nodes unreachable from any root (parent cycle or nesting too deep), dropped"
            );
        }
        debug!(
            containers = stats.containers,
            items = stats.items,
            attached = stats.attached,
            dangling = stats.dangling,
            duplicates = stats.duplicates,
            "Built tree"
        );

        BuiltTree {
            forest: Forest::new(forest_roots),
            stats,
        }
    }
}

fn assemble(
    index: usize,
    level: usize,
    slots: &mut [Option<TreeNode>],
    children_of: &HashMap<NodeID, Vec<usize>>,
    attached: &mut usize,
) -> Option<TreeNode> {
    let mut node = slots[index].take()?;
    *attached += 1;
    if let TreeNode::Container(container) = &mut node {
        if level >= MAX_NESTING {
            return Some(node);
        }
        if let Some(child_indices) = children_of.get(&container.id) {
            container.children = child_indices
                .iter()
                .filter_map(|&child| assemble(child, level + 1, slots, children_of, attached))
                .collect();
        }
    }
    Some(node)
}

/// Build a forest, discarding the stats
pub fn build_forest(containers: Vec<ContainerRecord>, items: Vec<ItemRecord>) -> Forest {
    TreeBuilder::new(containers, items).build().forest
}
