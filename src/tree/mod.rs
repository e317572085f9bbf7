//! Container/item tree: node types and the builder that assembles a forest
//! from flat records.

pub mod builder;
pub mod node;

pub use builder::{build_forest, BuildStats, BuiltTree, TreeBuilder, MAX_NESTING};
pub use node::{ContainerNode, Forest, ItemNode, NodeKind, TreeNode};
