//! JSON analysis report.
//!
//! The report carries every number a renderer needs: per-function timing,
//! the pruned call graph, node placements and the flame tree. It is an
//! output artefact; nothing in the pipeline reads it back except `validate`.

use crate::aggregator::{Aggregation, HotPath, ResolvedProfile, SelfTimePolicy};
use crate::flamegraph::{FlameSummary, FlameTree};
use crate::graph::PrunedGraph;
use crate::layout::{Footprint, LayoutKind, LayoutResult};
use crate::parser::SourceFormat;
use crate::utils::config::SCHEMA_VERSION;
use crate::utils::error::OutputError;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Where the analysed profile came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSource {
    pub path: String,
    pub format: SourceFormat,
    pub samples: usize,
    pub skipped_samples: usize,
    pub skipped_frames: usize,
}

/// Timing of one function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionTiming {
    pub name: String,
    pub self_weight: u64,
    pub cum_weight: u64,
    pub self_seconds: f64,
    pub cum_seconds: f64,
    pub self_percent: f64,
    pub cum_percent: f64,

    /// Survived pruning as a call-graph node
    pub retained: bool,
}

/// One edge of the pruned call graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallEdge {
    pub caller: String,
    pub callee: String,
}

/// Placement of one call-graph node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePlacementReport {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub footprint: Footprint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<usize>,
}

/// Call-graph layout section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutReport {
    pub kind: LayoutKind,
    pub width: f64,
    pub height: f64,
    pub nodes: Vec<NodePlacementReport>,
}

/// Complete analysis output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub version: String,
    pub source: ReportSource,
    pub generated_at: String,
    pub policy: SelfTimePolicy,
    pub period_nanos: u64,
    pub seconds_per_sample: f64,
    pub total_weight: u64,
    pub total_seconds: f64,

    /// Prune threshold in sample weight
    pub threshold_weight: u64,

    /// Every function, heaviest cumulative weight first
    pub functions: Vec<FunctionTiming>,
    pub edges: Vec<CallEdge>,
    pub layout: LayoutReport,
    pub hot_paths: Vec<HotPath>,
    pub flame: FlameSummary,
}

impl AnalysisReport {
    /// Assemble a report from the pipeline stages
    ///
    /// **Public** - glue between the pipeline and the JSON writer
    pub fn build(
        source: ReportSource,
        resolved: &ResolvedProfile,
        aggregation: &Aggregation,
        pruned: &PrunedGraph,
        layout: &LayoutResult,
        hot_paths: Vec<HotPath>,
        flame: &FlameTree,
    ) -> Self {
        let timing = &aggregation.timing;
        let clock = &aggregation.clock;
        let retained = pruned.graph.nodes();

        let mut functions: Vec<FunctionTiming> = timing
            .functions()
            .map(|id| {
                let (flat, cum) = (timing.self_weight(id), timing.cum_weight(id));
                FunctionTiming {
                    name: resolved.name(id).to_string(),
                    self_weight: flat,
                    cum_weight: cum,
                    self_seconds: clock.seconds(flat),
                    cum_seconds: clock.seconds(cum),
                    self_percent: clock.percent(flat),
                    cum_percent: clock.percent(cum),
                    retained: retained.contains(&id),
                }
            })
            .collect();
        functions.sort_by(|a, b| b.cum_weight.cmp(&a.cum_weight).then_with(|| a.name.cmp(&b.name)));

        let edges = pruned
            .graph
            .edges()
            .map(|(caller, callee)| CallEdge {
                caller: resolved.name(caller).to_string(),
                callee: resolved.name(callee).to_string(),
            })
            .collect();

        let (width, height) = layout.extent();
        let nodes = layout
            .iter()
            .map(|p| NodePlacementReport {
                name: resolved.name(p.id).to_string(),
                x: p.x,
                y: p.y,
                footprint: p.footprint,
                level: p.level,
            })
            .collect();

        Self {
            version: SCHEMA_VERSION.to_string(),
            source,
            generated_at: chrono::Utc::now().to_rfc3339(),
            policy: aggregation.policy,
            period_nanos: clock.period_nanos,
            seconds_per_sample: clock.seconds_per_sample,
            total_weight: clock.total_weight,
            total_seconds: clock.total_seconds(),
            threshold_weight: pruned.threshold_weight,
            functions,
            edges,
            layout: LayoutReport {
                kind: layout.kind,
                width,
                height,
                nodes,
            },
            hot_paths,
            flame: flame.flame_summary(),
        }
    }

    pub fn function(&self, name: &str) -> Option<&FunctionTiming> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn retained_count(&self) -> usize {
        self.functions.iter().filter(|f| f.retained).count()
    }
}

/// Write a report to a JSON file
///
/// **Public** - main entry point for JSON output
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path cannot be created or is invalid
///
/// # Example
/// ```ignore
/// let report = AnalysisReport::build(source, &resolved, &agg, &pruned, &layout, hot, &tree);
/// write_report(&report, "report.json")?;
/// ```
pub fn write_report(report: &AnalysisReport, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing report to: {}", output_path.display());

    super::prepare_output_path(output_path)?;

    let file = File::create(output_path).map_err(OutputError::WriteFailed)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, report)?;

    info!(
        "Report written successfully ({} bytes)",
        calculate_file_size(output_path)
    );

    Ok(())
}

/// Serialize a report to a pretty JSON string
pub fn report_to_string(report: &AnalysisReport) -> Result<String, OutputError> {
    Ok(serde_json::to_string_pretty(report)?)
}

fn calculate_file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Read a report from a JSON file
///
/// **Public** - used by `validate` and tests
///
/// # Errors
/// * `OutputError::WriteFailed` - File read error (reusing WriteFailed for I/O)
/// * `OutputError::SerializationFailed` - JSON parse error
pub fn read_report(input_path: impl AsRef<Path>) -> Result<AnalysisReport, OutputError> {
    let input_path = input_path.as_ref();

    debug!("Reading report from: {}", input_path.display());

    let file = File::open(input_path).map_err(OutputError::WriteFailed)?;
    let report: AnalysisReport = serde_json::from_reader(file)?;

    debug!(
        "Report loaded: version {}, source {}",
        report.version, report.source.path
    );

    Ok(report)
}
