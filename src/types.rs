//! Core identifier types shared by the store, tree and cache layers.

/// NodeID: Opaque identifier of a container or item record
///
/// Containers and items share one namespace; the builder enforces uniqueness.
pub type NodeID = String;

/// TagID: Opaque identifier of a tag record
pub type TagID = String;
