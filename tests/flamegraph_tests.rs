use pretty_assertions::assert_eq;
use profgraph::aggregator::{
    aggregate, calculate_hot_functions, resolve_stacks, SelfTimePolicy, SortKey,
};
use profgraph::flamegraph::{
    build_flame_tree, generate_flamegraph, FlameStats, FlamegraphConfig, FlameTree,
};
use profgraph::parser::parse_collapsed;
use profgraph::utils::FlamegraphError;

const PROFILE: &str = "A;B 5\nA;C 3\nA 2\nruntime.mallocgc 1\n";

#[test]
fn test_scenario_tree_shape() {
    let profile = parse_collapsed("A;B 5\nA;C 3\nA 2\n", 10_000_000).unwrap();
    let tree = build_flame_tree(&resolve_stacks(&profile));

    assert_eq!(tree.total_weight(), 10);

    let a = tree.children(tree.root());
    assert_eq!(a.len(), 1);
    let a_node = tree.node(a[0]);
    assert_eq!((a_node.name.as_str(), a_node.weight, a_node.self_weight), ("A", 10, 2));

    let children: Vec<(String, u64)> = tree
        .children(a[0])
        .into_iter()
        .map(|c| (tree.node(c).name.clone(), tree.node(c).weight))
        .collect();
    assert_eq!(children, vec![("B".to_string(), 5), ("C".to_string(), 3)]);
}

#[test]
fn test_root_weight_equals_total_sample_weight() {
    let profile = parse_collapsed(PROFILE, 10_000_000).unwrap();
    let resolved = resolve_stacks(&profile);
    let tree = build_flame_tree(&resolved);

    assert_eq!(tree.total_weight(), resolved.total_weight());
    assert_eq!(tree.flame_summary().root.weight, 11);
}

#[test]
fn test_svg_contains_every_frame_and_header() {
    let profile = parse_collapsed(PROFILE, 10_000_000).unwrap();
    let resolved = resolve_stacks(&profile);
    let aggregation = aggregate(&profile, &resolved, SelfTimePolicy::Leaf);
    let tree = build_flame_tree(&resolved);

    let stats = FlameStats {
        clock: aggregation.clock,
        function_count: resolved.interner.len(),
        hot_functions: calculate_hot_functions(
            &aggregation.timing,
            &resolved.interner,
            &aggregation.clock,
            5,
            SortKey::Cum,
        ),
    };
    let config = FlamegraphConfig::new().with_title("Checkout <service>");
    let svg = generate_flamegraph(&tree, &stats, Some(&config)).unwrap();

    // one frame per tree node, root included
    assert_eq!(svg.matches("<g class=\"frame\">").count(), tree.len());
    assert!(svg.contains("Checkout &lt;service&gt;"));
    assert!(svg.contains("Total samples: 11"));
    assert!(svg.contains("Sampling rate: 100.0 Hz"));
    assert!(svg.contains("Hot functions: A (90.9%)"));
}

#[test]
fn test_empty_tree_is_an_error() {
    let profile = parse_collapsed("", 10_000_000).unwrap();
    let resolved = resolve_stacks(&profile);
    let aggregation = aggregate(&profile, &resolved, SelfTimePolicy::Top);
    let stats = FlameStats {
        clock: aggregation.clock,
        function_count: 0,
        hot_functions: Vec::new(),
    };

    let result = generate_flamegraph(&FlameTree::new(), &stats, None);
    assert!(matches!(result, Err(FlamegraphError::EmptyTree)));
}
