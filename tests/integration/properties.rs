use notetree::store::{ContainerRecord, ItemRecord};
use notetree::tree::{build_forest, TreeBuilder};
use proptest::prelude::*;
use std::collections::HashSet;

/// Parent reference: none, an existing container index, or a dangling id
fn arb_parent(max: usize) -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        (0..max).prop_map(|i| Some(format!("c{}", i))),
        (0..4usize).prop_map(|i| Some(format!("missing{}", i))),
    ]
}

fn arb_records() -> impl Strategy<Value = (Vec<ContainerRecord>, Vec<ItemRecord>)> {
    (1usize..12).prop_flat_map(|n| {
        let containers = prop::collection::vec(("[a-c]{1,2}", arb_parent(n)), n).prop_map(
            |specs| {
                specs
                    .into_iter()
                    .enumerate()
                    .map(|(i, (name, parent_id))| ContainerRecord {
                        id: format!("c{}", i),
                        name,
                        parent_id,
                    })
                    .collect::<Vec<_>>()
            },
        );
        let items = prop::collection::vec(("[a-c]{1,2}", arb_parent(n)), 0..16).prop_map(
            |specs| {
                specs
                    .into_iter()
                    .enumerate()
                    .map(|(i, (title, container_id))| ItemRecord {
                        id: format!("i{}", i),
                        title,
                        container_id,
                        tags: Vec::new(),
                    })
                    .collect::<Vec<_>>()
            },
        );
        (containers, items)
    })
}

proptest! {
    /// No two nodes in a built forest share an id
    #[test]
    fn built_forest_ids_are_unique((containers, items) in arb_records()) {
        let forest = build_forest(containers, items);
        let ids = forest.ids();
        let unique: HashSet<&str> = ids.iter().copied().collect();
        prop_assert_eq!(unique.len(), ids.len());
    }

    /// Identical input builds identical forests, children order included
    #[test]
    fn rebuild_is_deterministic((containers, items) in arb_records()) {
        let first = build_forest(containers.clone(), items.clone());
        let second = build_forest(containers, items);
        prop_assert_eq!(first, second);
    }

    /// Nodes whose parent does not exist never appear, and the build does not fail
    #[test]
    fn dangling_parents_are_dropped((containers, items) in arb_records()) {
        let dangling: HashSet<String> = containers
            .iter()
            .filter(|c| c.parent_id.as_deref().is_some_and(|p| p.starts_with("missing")))
            .map(|c| c.id.clone())
            .chain(
                items
                    .iter()
                    .filter(|i| i.container_id.as_deref().is_some_and(|p| p.starts_with("missing")))
                    .map(|i| i.id.clone()),
            )
            .collect();

        let built = TreeBuilder::new(containers, items).build();
        for id in built.forest.ids() {
            prop_assert!(!dangling.contains(id));
        }
        prop_assert_eq!(built.stats.dangling, dangling.len());
    }

    /// Every attached node is counted exactly once
    #[test]
    fn stats_account_for_every_record((containers, items) in arb_records()) {
        let total = containers.len() + items.len();
        let built = TreeBuilder::new(containers, items).build();
        let stats = built.stats;
        prop_assert_eq!(built.forest.node_count(), stats.attached);
        prop_assert_eq!(
            stats.attached + stats.dangling + stats.duplicates + stats.unreachable,
            total
        );
    }
}
