//! Plain-text outline rendering of a projected forest.
//!
//! At each container, child containers are listed before child items. An item
//! whose label equals the index label becomes the container's own link target
//! and is left out of the item list. Top-level items have no container line to
//! carry them, so they are always listed.

use crate::tree::{ContainerNode, Forest, ItemNode, TreeNode};
use owo_colors::OwoColorize;

/// Link prefix for items
pub const ITEM_LINK_SCHEME: &str = "notetree://item/";

#[derive(Debug, Clone)]
pub struct OutlineOptions {
    /// Reserved item label promoted to its container's link
    pub index_label: Option<String>,
    /// Append item links
    pub show_links: bool,
    /// ANSI styling
    pub color: bool,
    /// Spaces per nesting level
    pub indent: usize,
}

impl Default for OutlineOptions {
    fn default() -> Self {
        Self {
            index_label: Some("index".to_string()),
            show_links: true,
            color: false,
            indent: 2,
        }
    }
}

pub fn item_link(id: &str) -> String {
    format!("{}{}", ITEM_LINK_SCHEME, id)
}

/// Render `forest` as an indented outline, one node per line
pub fn render_outline(forest: &Forest, options: &OutlineOptions) -> String {
    let mut out = String::new();
    render_level(&forest.roots, 0, false, options, &mut out);
    out
}

fn render_level(
    nodes: &[TreeNode],
    level: usize,
    hoisted: bool,
    options: &OutlineOptions,
    out: &mut String,
) {
    let containers = nodes.iter().filter_map(|n| match n {
        TreeNode::Container(c) => Some(c),
        TreeNode::Item(_) => None,
    });
    for container in containers {
        render_container(container, level, options, out);
    }

    for node in nodes {
        if let TreeNode::Item(item) = node {
            if !(hoisted && is_index(item, options)) {
                render_item(item, level, options, out);
            }
        }
    }
}

fn is_index(item: &ItemNode, options: &OutlineOptions) -> bool {
    options.index_label.as_deref() == Some(item.label.as_str())
}

fn render_container(container: &ContainerNode, level: usize, options: &OutlineOptions, out: &mut String) {
    let index = container.children.iter().find_map(|n| match n {
        TreeNode::Item(item) if is_index(item, options) => Some(item),
        _ => None,
    });

    out.push_str(&" ".repeat(level * options.indent));
    let label = format!("{}/", container.label);
    if options.color {
        out.push_str(&label.bold().to_string());
    } else {
        out.push_str(&label);
    }
    if let Some(index) = index {
        push_link(&index.id, options, out);
    }
    out.push('\n');

    render_level(&container.children, level + 1, true, options, out);
}

fn render_item(item: &ItemNode, level: usize, options: &OutlineOptions, out: &mut String) {
    out.push_str(&" ".repeat(level * options.indent));
    out.push_str("- ");
    out.push_str(&item.label);
    if options.show_links {
        push_link(&item.id, options, out);
    }
    out.push('\n');
}

fn push_link(id: &str, options: &OutlineOptions, out: &mut String) {
    let link = format!("<{}>", item_link(id));
    out.push(' ');
    if options.color {
        out.push_str(&link.dimmed().to_string());
    } else {
        out.push_str(&link);
    }
}
