use crate::aggregator::SortKey;
use crate::parser::SourceFormat;
use crate::utils::config::{AnalysisConfig, MAX_TOP_N};
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Arguments for the analyze command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct AnalyzeArgs {
    /// Profile to analyse
    pub input: PathBuf,

    /// Input format; detected from the file when `None`
    pub format: Option<SourceFormat>,

    /// Output path for the JSON report
    pub output_json: PathBuf,

    /// Output path for the call graph SVG (optional)
    pub output_callgraph: Option<PathBuf>,

    /// Output path for the flame graph SVG (optional)
    pub output_flamegraph: Option<PathBuf>,

    /// Output path for folded stacks (optional)
    pub output_folded: Option<PathBuf>,

    /// Overrides the profile's sampling period, in nanoseconds
    pub period_ns: Option<u64>,

    /// Title for both SVGs
    pub title: Option<String>,

    /// Print a text summary to stdout
    pub print_summary: bool,

    /// Settings after config file and CLI overrides
    pub config: AnalysisConfig,
}

impl Default for AnalyzeArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            format: None,
            output_json: PathBuf::from("report.json"),
            output_callgraph: Some(PathBuf::from("callgraph.svg")),
            output_flamegraph: Some(PathBuf::from("flamegraph.svg")),
            output_folded: None,
            period_ns: None,
            title: None,
            print_summary: false,
            config: AnalysisConfig::default(),
        }
    }
}

/// Arguments for the top command
#[derive(Debug, Clone)]
pub struct TopArgs {
    pub input: PathBuf,
    pub format: Option<SourceFormat>,
    pub period_ns: Option<u64>,
    pub sort: SortKey,
    pub config: AnalysisConfig,
}

impl Default for TopArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            format: None,
            period_ns: None,
            sort: SortKey::default(),
            config: AnalysisConfig::default(),
        }
    }
}

/// Validate analyze command arguments
///
/// **Public** - should be called before execute_analyze
///
/// # Errors
/// Returns error if any argument is invalid
pub fn validate_args(args: &AnalyzeArgs) -> Result<()> {
    validate_input(&args.input)?;
    validate_period(args.period_ns)?;

    if let Some(title) = &args.title {
        if title.trim().is_empty() {
            anyhow::bail!("Title cannot be blank");
        }
    }

    let outputs = [
        Some(&args.output_json),
        args.output_callgraph.as_ref(),
        args.output_flamegraph.as_ref(),
        args.output_folded.as_ref(),
    ];
    for output in outputs.into_iter().flatten() {
        if output == &args.input {
            anyhow::bail!("Output {} would overwrite the input profile", output.display());
        }
    }

    args.config.validate()?;
    Ok(())
}

/// Validate top command arguments
pub fn validate_top_args(args: &TopArgs) -> Result<()> {
    validate_input(&args.input)?;
    validate_period(args.period_ns)?;

    if args.config.top_n == 0 {
        anyhow::bail!("top must be greater than 0");
    }

    if args.config.top_n > MAX_TOP_N {
        anyhow::bail!("top is too large (max {})", MAX_TOP_N);
    }

    args.config.validate()?;
    Ok(())
}

fn validate_input(input: &Path) -> Result<()> {
    if input.as_os_str().is_empty() {
        anyhow::bail!("Input profile path cannot be empty");
    }

    if !input.is_file() {
        anyhow::bail!("Input profile not found: {}", input.display());
    }

    Ok(())
}

fn validate_period(period_ns: Option<u64>) -> Result<()> {
    if period_ns == Some(0) {
        anyhow::bail!("period-ns must be greater than 0");
    }
    Ok(())
}
