use crate::output::read_report;
use crate::parser::{read_profile_file, PeriodUnit, Profile, SourceFormat};
use crate::utils::config::SCHEMA_VERSION;
use anyhow::{Context, Result};
use colored::Colorize;
use log::info;
use std::path::Path;

/// Read a profile and apply a sampling period override
///
/// The override is in nanoseconds and replaces whatever period (and unit)
/// the file declared.
pub fn load_profile(
    input: &Path,
    format: Option<SourceFormat>,
    default_period_ns: u64,
    period_ns: Option<u64>,
) -> Result<Profile> {
    let mut profile = read_profile_file(input, format, default_period_ns)
        .with_context(|| format!("Failed to read profile {}", input.display()))?;

    if let Some(period) = period_ns {
        info!(
            "Overriding sampling period: {} {} -> {} ns",
            profile.period,
            profile.period_unit.label(),
            period
        );
        profile.period = period;
        profile.period_unit = PeriodUnit::Nanoseconds;
    }

    Ok(profile)
}

/// Validate a report JSON file
pub fn validate_report_file(file_path: &Path) -> Result<()> {
    println!("Validating report: {}", file_path.display());

    let report = read_report(file_path)
        .with_context(|| format!("Failed to read report {}", file_path.display()))?;

    if report.version != SCHEMA_VERSION {
        println!(
            "{} schema version {} differs from current {}",
            "!".yellow(),
            report.version,
            SCHEMA_VERSION
        );
    }

    println!("{} Valid report JSON", "✓".green());
    println!("  Version:      {}", report.version);
    println!("  Source:       {} ({})", report.source.path, report.source.format);
    println!("  Policy:       {}", report.policy);
    println!("  Total weight: {}", report.total_weight);
    println!("  Total time:   {:.3}s", report.total_seconds);
    println!(
        "  Functions:    {} ({} kept after pruning)",
        report.functions.len(),
        report.retained_count()
    );
    println!("  Edges:        {}", report.edges.len());
    println!("  Layout:       {} ({} nodes)", report.layout.kind, report.layout.nodes.len());
    println!("  Flame frames: {}", report.flame.node_count);

    Ok(())
}

/// Display schema information
pub fn display_schema(show_details: bool) {
    println!("profgraph Report Schema");
    println!("Current Version: {}", SCHEMA_VERSION);
    println!();

    if show_details {
        println!("Schema Structure:");
        println!("  version: string             - Schema version (e.g., '1.0.0')");
        println!("  source: object              - Input path, format, sample counts");
        println!("  generated_at: string        - RFC 3339 timestamp");
        println!("  policy: string              - Self-time policy (top, leaf, uniform)");
        println!("  period_nanos: number        - Sampling period in nanoseconds");
        println!("  seconds_per_sample: number  - Wall time of one unit of weight");
        println!("  total_weight: number        - Sum of resolved sample weights");
        println!("  total_seconds: number       - Wall time of the whole profile");
        println!("  threshold_weight: number    - Prune threshold in sample weight");
        println!("  functions: array            - Per-function timing");
        println!("    name: string");
        println!("    self_weight/cum_weight: number");
        println!("    self_seconds/cum_seconds: number");
        println!("    self_percent/cum_percent: number");
        println!("    retained: bool            - Kept in the pruned call graph");
        println!("  edges: array                - Pruned call edges {{caller, callee}}");
        println!("  layout: object              - kind, width, height, nodes[]");
        println!("    nodes[]: name, x, y, footprint {{shape, ...}}, level?");
        println!("  hot_paths: array            - Heaviest stacks {{stack, weight, percentage}}");
        println!("  flame: object               - total_weight, node_count, max_depth, root");
    } else {
        println!("Use --show for detailed schema information");
    }
}

/// Display version information
pub fn display_version() {
    println!("profgraph v{}", env!("CARGO_PKG_VERSION"));
    println!("Report Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Call graphs and flame graphs from sampled CPU profiles.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_period_override_switches_to_nanoseconds() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "main;work 3").unwrap();

        let profile =
            load_profile(file.path(), Some(SourceFormat::Collapsed), 10_000_000, Some(250)).unwrap();

        assert_eq!(profile.period, 250);
        assert_eq!(profile.period_unit, PeriodUnit::Nanoseconds);
        assert_eq!(profile.period_nanos(), 250);
    }

    #[test]
    fn test_missing_report_is_an_error() {
        assert!(validate_report_file(Path::new("/no/such/report.json")).is_err());
    }
}
