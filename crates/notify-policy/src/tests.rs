//! Property-based tests for tree shaping.

use crate::*;
use notify_validation::{HumanDuration, Matcher, MatchOperator};
use proptest::prelude::*;

/// Builds a chain of `depth` nested routes under the root, each setting
/// only the fields selected by `overrides`.
fn chain(depth: usize, overrides: &[(bool, u64)]) -> PolicyTree {
    let defaults = PolicyDefaults {
        receiver: Some("root".to_string()),
        ..PolicyDefaults::default()
    };
    let mut tree = PolicyTree::build_root_route(defaults, &[]).unwrap();
    let mut parent = RoutePath::root();
    for level in 0..depth {
        let mut node = RouteNode::new().with_matchers(vec![
            Matcher::new(format!("l{level}"), MatchOperator::Equal, "x").unwrap(),
        ]);
        if let Some((true, secs)) = overrides.get(level) {
            node = node.with_group_wait(HumanDuration::from_secs(*secs));
        }
        tree = tree.insert_child_route(&parent, node).unwrap();
        parent = parent.child(0);
    }
    tree
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_no_overrides_resolves_to_root(depth in 0usize..8) {
        let tree = chain(depth, &[]);
        let path = RoutePath::new(vec![0; depth]);
        let timing = tree.resolve_effective_timing(&path).unwrap();
        let root = tree.root();
        prop_assert_eq!(Some(timing.group_wait), root.group_wait);
        prop_assert_eq!(Some(timing.group_interval), root.group_interval);
        prop_assert_eq!(Some(timing.repeat_interval), root.repeat_interval);
    }

    #[test]
    fn prop_nearest_override_wins(
        overrides in prop::collection::vec((any::<bool>(), 1u64..100_000), 1..8)
    ) {
        let depth = overrides.len();
        let tree = chain(depth, &overrides);
        let timing = tree
            .resolve_effective_timing(&RoutePath::new(vec![0; depth]))
            .unwrap();

        let expected = overrides
            .iter()
            .rev()
            .find(|(set, _)| *set)
            .map_or(tree::DEFAULT_GROUP_WAIT, |(_, secs)| HumanDuration::from_secs(*secs));
        prop_assert_eq!(timing.group_wait, expected);
    }

    #[test]
    fn prop_remove_then_node_count(depth in 1usize..8, cut in 0usize..8) {
        let cut = cut % depth;
        let tree = chain(depth, &[]);
        let path = RoutePath::new(vec![0; cut + 1]);
        let pruned = tree.remove_child_route(&path).unwrap();
        prop_assert_eq!(pruned.root().node_count(), cut + 1);
        prop_assert!(pruned.node(&path).is_err());
    }

    #[test]
    fn prop_path_text_round_trip(indices in prop::collection::vec(0usize..50, 0..6)) {
        let path = RoutePath::new(indices);
        let parsed: RoutePath = path.to_string().parse().unwrap();
        prop_assert_eq!(parsed, path);
    }
}
