//! Analyze command implementation.
//!
//! The analyze command:
//! 1. Reads the profile
//! 2. Resolves stacks
//! 3. Attributes self/cumulative time
//! 4. Prunes the call graph
//! 5. Lays out the call graph
//! 6. Builds the flame tree
//! 7. Writes output files

use super::models::AnalyzeArgs;
use super::utils::load_profile;
use crate::aggregator::{
    aggregate, build_collapsed_stacks, calculate_hot_functions, calculate_hot_paths,
    calculate_weight_distribution, resolve_stacks, SortKey,
};
use crate::flamegraph::{
    build_flame_tree, generate_flamegraph, generate_text_summary, FlameStats, FlamegraphConfig,
};
use crate::graph::{generate_callgraph, prune, CallGraphView};
use crate::layout::compute_layout;
use crate::output::{write_folded, write_report, write_svg, AnalysisReport, ReportSource};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::time::Instant;

const FLAME_HEADER_FUNCTIONS: usize = 5;

/// Execute the analyze command
///
/// **Public** - main entry point called from main.rs
///
/// # Arguments
/// * `args` - Analyze command arguments, already validated
///
/// # Returns
/// The report that was written, so callers can inspect it
///
/// # Errors
/// * Profile read or decode failures
/// * File write errors
///
/// # Example
/// ```ignore
/// let args = AnalyzeArgs {
///     input: PathBuf::from("cpu.pb.json"),
///     ..AnalyzeArgs::default()
/// };
/// validate_args(&args)?;
/// execute_analyze(args)?;
/// ```
pub fn execute_analyze(args: AnalyzeArgs) -> Result<AnalysisReport> {
    let start_time = Instant::now();
    let config = &args.config;

    info!("Analyzing profile: {}", args.input.display());

    // Step 1: Read profile
    info!("Step 1/7: Reading profile...");
    let profile = load_profile(&args.input, args.format, config.default_period_ns, args.period_ns)?;

    debug!(
        "Decoded {} samples, {} functions, {} locations",
        profile.sample_count(),
        profile.functions.len(),
        profile.locations.len()
    );

    // Step 2: Resolve stacks
    info!("Step 2/7: Resolving stacks...");
    let resolved = resolve_stacks(&profile);
    if resolved.is_empty() {
        warn!("No sample resolved to a stack; outputs will be empty");
    }

    // Step 3: Attribute time
    info!("Step 3/7: Attributing time ({} policy)...", config.policy);
    let aggregation = aggregate(&profile, &resolved, config.policy);
    let clock = aggregation.clock;

    let collapsed = build_collapsed_stacks(&resolved);
    let distribution = calculate_weight_distribution(&collapsed);
    info!("Weight distribution: {}", distribution.summary());
    if distribution.is_highly_concentrated() {
        info!("Most of the weight sits in a few stacks; see hot paths");
    }

    // Step 4: Prune
    let threshold = config.prune_threshold();
    info!("Step 4/7: Pruning call graph (threshold {})...", threshold);
    let pruned = prune(&aggregation.graph, &aggregation.timing, threshold, &clock);

    // Step 5: Layout
    info!("Step 5/7: Computing {} layout...", config.layout);
    let layout = compute_layout(
        &pruned.graph,
        &aggregation.timing,
        config.layout,
        &config.hierarchical,
        &config.force,
    );

    // Step 6: Flame tree
    info!("Step 6/7: Building flame tree...");
    let flame_tree = build_flame_tree(&resolved);

    // Step 7: Write outputs
    info!("Step 7/7: Writing output files...");

    let hot_paths = calculate_hot_paths(&collapsed, &clock, config.top_n);
    let source = ReportSource {
        path: args.input.display().to_string(),
        format: profile.format,
        samples: profile.sample_count(),
        skipped_samples: resolved.skipped_samples,
        skipped_frames: resolved.skipped_frames,
    };
    let report = AnalysisReport::build(
        source,
        &resolved,
        &aggregation,
        &pruned,
        &layout,
        hot_paths.clone(),
        &flame_tree,
    );

    write_report(&report, &args.output_json).context("Failed to write report JSON")?;
    info!("✓ Report written to: {}", args.output_json.display());

    if let Some(path) = &args.output_callgraph {
        let view = CallGraphView {
            graph: &pruned.graph,
            layout: &layout,
            timing: &aggregation.timing,
            clock: &clock,
            interner: &resolved.interner,
        };
        let title = args.title.as_deref().unwrap_or("Type: cpu");
        let svg = generate_callgraph(&view, title);
        write_svg(&svg, path).context("Failed to write call graph SVG")?;
        info!("✓ Call graph written to: {}", path.display());
    }

    if let Some(path) = &args.output_flamegraph {
        if flame_tree.is_empty() || flame_tree.total_weight() == 0 {
            warn!("Skipping flame graph: no weighted stacks to draw");
        } else {
            let stats = FlameStats {
                clock,
                function_count: resolved.interner.len(),
                hot_functions: calculate_hot_functions(
                    &aggregation.timing,
                    &resolved.interner,
                    &clock,
                    FLAME_HEADER_FUNCTIONS,
                    SortKey::Cum,
                ),
            };
            let mut fg_config = FlamegraphConfig::new();
            if let Some(title) = &args.title {
                fg_config = fg_config.with_title(title.clone());
            }
            let svg = generate_flamegraph(&flame_tree, &stats, Some(&fg_config))
                .context("Failed to generate flame graph")?;
            write_svg(&svg, path).context("Failed to write flame graph SVG")?;
            info!("✓ Flame graph written to: {}", path.display());
        }
    }

    if let Some(path) = &args.output_folded {
        write_folded(&collapsed, path).context("Failed to write folded stacks")?;
        info!("✓ Folded stacks written to: {}", path.display());
    }

    if args.print_summary {
        let functions = calculate_hot_functions(
            &aggregation.timing,
            &resolved.interner,
            &clock,
            config.top_n,
            SortKey::Flat,
        );

        println!("\n{}", "=".repeat(80));
        println!("PROFILE SUMMARY");
        println!("{}", "=".repeat(80));
        println!("Profile:      {}", args.input.display());
        println!("Samples:      {}", profile.sample_count());
        println!("Total time:   {:.3}s", clock.total_seconds());
        println!("Policy:       {}", config.policy);
        println!(
            "Call graph:   {} nodes, {} edges ({} nodes pruned)",
            pruned.graph.node_count(),
            pruned.graph.edge_count(),
            pruned.dropped_nodes
        );
        println!("Flame frames: {}", flame_tree.len() - 1);
        println!(
            "\n{}",
            generate_text_summary(&functions, &hot_paths, resolved.interner.len())
        );
        println!("{}", "=".repeat(80));
    }

    let elapsed = start_time.elapsed();
    info!("Analysis completed in {:.2}s", elapsed.as_secs_f64());

    Ok(report)
}
