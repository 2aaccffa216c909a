use profgraph::aggregator::{aggregate, resolve_stacks, Aggregation, ResolvedProfile, SelfTimePolicy};
use profgraph::graph::{generate_callgraph, prune, CallGraphView, PruneThreshold};
use profgraph::layout::{compute_layout, ForceConfig, HierarchicalConfig, LayoutKind};
use profgraph::parser::parse_collapsed;

const PROFILE: &str = "\
main;serve;parse 40
main;serve;render;escape 25
main;serve;render 10
main;gc 5
main;init 2
main 1
";

fn analyse() -> (ResolvedProfile, Aggregation) {
    // 10 ms period, so 100 samples make one second
    let profile = parse_collapsed(PROFILE, 10_000_000).unwrap();
    let resolved = resolve_stacks(&profile);
    let aggregation = aggregate(&profile, &resolved, SelfTimePolicy::Leaf);
    (resolved, aggregation)
}

#[test]
fn test_raising_threshold_never_grows_graph() {
    let (_, agg) = analyse();

    let mut previous = (usize::MAX, usize::MAX);
    for weight in [0, 1, 2, 5, 10, 25, 35, 75, 83, 84, 1000] {
        let pruned = prune(&agg.graph, &agg.timing, PruneThreshold::Weight(weight), &agg.clock);
        let current = (pruned.graph.node_count(), pruned.graph.edge_count());
        assert!(current.0 <= previous.0 && current.1 <= previous.1, "grew at {}", weight);
        previous = current;
    }
    assert_eq!(previous, (0, 0));
}

#[test]
fn test_seconds_threshold_matches_weight_threshold() {
    let (_, agg) = analyse();

    // 0.295 s at 10 ms per sample rounds up to 30 samples
    let by_secs = prune(&agg.graph, &agg.timing, PruneThreshold::Seconds(0.295), &agg.clock);
    let by_weight = prune(&agg.graph, &agg.timing, PruneThreshold::Weight(30), &agg.clock);

    assert_eq!(by_secs.threshold_weight, 30);
    assert_eq!(by_secs.graph, by_weight.graph);
}

#[test]
fn test_pruned_edges_only_join_survivors() {
    let (resolved, agg) = analyse();
    let pruned = prune(&agg.graph, &agg.timing, PruneThreshold::Weight(30), &agg.clock);

    for (caller, callee) in pruned.graph.edges() {
        assert!(agg.timing.cum_weight(caller) >= 30, "{}", resolved.name(caller));
        assert!(agg.timing.cum_weight(callee) >= 30, "{}", resolved.name(callee));
    }
    assert!(pruned.dropped_nodes > 0);
}

#[test]
fn test_callgraph_svg_marks_hot_nodes() {
    let (resolved, agg) = analyse();
    let pruned = prune(&agg.graph, &agg.timing, PruneThreshold::Weight(1), &agg.clock);
    let layout = compute_layout(
        &pruned.graph,
        &agg.timing,
        LayoutKind::Hierarchical,
        &HierarchicalConfig::default(),
        &ForceConfig::default(),
    );

    let svg = generate_callgraph(
        &CallGraphView {
            graph: &pruned.graph,
            layout: &layout,
            timing: &agg.timing,
            clock: &agg.clock,
            interner: &resolved.interner,
        },
        "Type: cpu",
    );

    assert!(svg.contains("class=\"node hot\""));
    assert!(svg.contains("marker-end: url(#arrowhead)"));
    assert!(svg.contains("cum: 0.83s (100.00%)"));
    assert_eq!(svg.matches("class=\"edge\"").count(), pruned.graph.edge_count());
}

#[test]
fn test_force_callgraph_draws_circles() {
    let (resolved, agg) = analyse();
    let pruned = prune(&agg.graph, &agg.timing, PruneThreshold::Weight(0), &agg.clock);
    let layout = compute_layout(
        &pruned.graph,
        &agg.timing,
        LayoutKind::Force,
        &HierarchicalConfig::default(),
        &ForceConfig::default(),
    );

    let svg = generate_callgraph(
        &CallGraphView {
            graph: &pruned.graph,
            layout: &layout,
            timing: &agg.timing,
            clock: &agg.clock,
            interner: &resolved.interner,
        },
        "Type: cpu",
    );

    assert_eq!(svg.matches("<circle").count(), pruned.graph.node_count());
    assert!(svg.contains(&format!(
        "{} functions, {} edges",
        pruned.graph.node_count(),
        pruned.graph.edge_count()
    )));
}

#[test]
fn test_edge_labels_show_caller_cum_time() {
    let (resolved, agg) = analyse();
    let pruned = prune(&agg.graph, &agg.timing, PruneThreshold::Weight(1), &agg.clock);
    let layout = compute_layout(
        &pruned.graph,
        &agg.timing,
        LayoutKind::Hierarchical,
        &HierarchicalConfig::default(),
        &ForceConfig::default(),
    );

    let svg = generate_callgraph(
        &CallGraphView {
            graph: &pruned.graph,
            layout: &layout,
            timing: &agg.timing,
            clock: &agg.clock,
            interner: &resolved.interner,
        },
        "Type: cpu",
    );

    // main calls serve, gc and init; serve calls parse and render
    assert_eq!(svg.matches(">0.83s (100.00%)</text>").count(), 3);
    assert_eq!(svg.matches(">0.75s (75.00%)</text>").count(), 2);
    assert_eq!(svg.matches(">0.35s (35.00%)</text>").count(), 1);
    // parse is a leaf, so its time never labels an edge
    assert_eq!(svg.matches(">0.40s (40.00%)</text>").count(), 0);
}
