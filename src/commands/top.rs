//! Top command: print the hot-function table without writing files.

use super::models::TopArgs;
use super::utils::load_profile;
use crate::aggregator::{aggregate, calculate_hot_functions, resolve_stacks, HotFunction};
use crate::flamegraph::generate_text_summary;
use anyhow::Result;
use log::info;

/// Execute the top command
///
/// **Public** - main entry point called from main.rs
///
/// Returns the rows that were printed.
pub fn execute_top(args: TopArgs) -> Result<Vec<HotFunction>> {
    let config = &args.config;
    let profile = load_profile(&args.input, args.format, config.default_period_ns, args.period_ns)?;
    let resolved = resolve_stacks(&profile);
    let aggregation = aggregate(&profile, &resolved, config.policy);

    info!(
        "Ranking {} functions by {:?}",
        aggregation.timing.len(),
        args.sort
    );

    let rows = calculate_hot_functions(
        &aggregation.timing,
        &resolved.interner,
        &aggregation.clock,
        config.top_n,
        args.sort,
    );

    println!(
        "Duration: {:.2}s, Total samples = {:.2}s",
        aggregation.clock.total_seconds(),
        aggregation.clock.seconds(aggregation.timing.total_weight())
    );
    println!("{}", generate_text_summary(&rows, &[], resolved.interner.len()));

    Ok(rows)
}
