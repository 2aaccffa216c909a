//! profgraph CLI
//!
//! Call graphs and flame graphs from sampled CPU profiles.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use profgraph::aggregator::{SelfTimePolicy, SortKey};
use profgraph::commands::{
    display_schema, display_version, execute_analyze, execute_top, validate_args,
    validate_report_file, validate_top_args, AnalyzeArgs, TopArgs,
};
use profgraph::layout::LayoutKind;
use profgraph::parser::SourceFormat;
use profgraph::utils::config::{load_config, AnalysisConfig};

/// profgraph - call graphs and flame graphs from CPU profiles
#[derive(Parser, Debug)]
#[command(name = "profgraph")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyse a profile and write the report and SVGs
    Analyze {
        /// Profile to analyse (pprof JSON or folded stacks)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format; detected from the file if omitted
        #[arg(long)]
        format: Option<SourceFormat>,

        /// Output path for the JSON report
        #[arg(short, long, default_value = "report.json")]
        output: PathBuf,

        /// Output path for the call graph SVG
        #[arg(long)]
        callgraph: Option<PathBuf>,

        /// Output path for the flame graph SVG
        #[arg(long)]
        flamegraph: Option<PathBuf>,

        /// Output path for folded stacks
        #[arg(long)]
        folded: Option<PathBuf>,

        /// Call graph layout (hierarchical or force)
        #[arg(long)]
        layout: Option<LayoutKind>,

        /// Self-time policy (top, leaf or uniform)
        #[arg(long)]
        policy: Option<SelfTimePolicy>,

        /// Prune functions below this many seconds of cumulative time
        #[arg(long, conflicts_with = "threshold_weight")]
        threshold_secs: Option<f64>,

        /// Prune functions below this cumulative sample weight
        #[arg(long)]
        threshold_weight: Option<u64>,

        /// Override the sampling period, in nanoseconds
        #[arg(long)]
        period_ns: Option<u64>,

        /// Seed for the force-directed layout
        #[arg(long)]
        seed: Option<u64>,

        /// Iteration cap for the force-directed layout
        #[arg(long)]
        iterations: Option<usize>,

        /// Layout canvas width in pixels
        #[arg(long)]
        width: Option<f64>,

        /// Layout canvas height in pixels
        #[arg(long)]
        height: Option<f64>,

        /// Title for the SVGs
        #[arg(long)]
        title: Option<String>,

        /// TOML file with analysis settings
        #[arg(long, env = "PROFGRAPH_CONFIG")]
        config: Option<PathBuf>,

        /// Print text summary to stdout
        #[arg(long)]
        summary: bool,

        /// Rows in hot-function tables and hot paths in the report
        #[arg(long)]
        top: Option<usize>,
    },

    /// Print the hottest functions of a profile
    Top {
        /// Profile to analyse
        #[arg(short, long)]
        input: PathBuf,

        /// Input format; detected from the file if omitted
        #[arg(long)]
        format: Option<SourceFormat>,

        /// Number of rows
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,

        /// Self-time policy (top, leaf or uniform)
        #[arg(long, default_value = "top")]
        policy: SelfTimePolicy,

        /// Sort column (flat or cum)
        #[arg(long, default_value = "flat")]
        sort: SortKey,

        /// Override the sampling period, in nanoseconds
        #[arg(long)]
        period_ns: Option<u64>,
    },

    /// Validate a report JSON file
    Validate {
        /// Path to report JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display schema information
    Schema {
        /// Show full schema details
        #[arg(long)]
        show: bool,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Analyze {
            input,
            format,
            output,
            callgraph,
            flamegraph,
            folded,
            layout,
            policy,
            threshold_secs,
            threshold_weight,
            period_ns,
            seed,
            iterations,
            width,
            height,
            title,
            config,
            summary,
            top,
        } => {
            // File settings first, flags on top
            let mut analysis = match config {
                Some(path) => load_config(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => AnalysisConfig::default(),
            };

            if let Some(policy) = policy {
                analysis = analysis.with_policy(policy);
            }
            if let Some(layout) = layout {
                analysis = analysis.with_layout(layout);
            }
            if threshold_secs.is_some() || threshold_weight.is_some() {
                analysis.threshold_secs = threshold_secs;
                analysis.threshold_weight = threshold_weight;
            }
            if let Some(seed) = seed {
                analysis.force = analysis.force.with_seed(seed);
            }
            if let Some(iterations) = iterations {
                analysis.force = analysis.force.with_iterations(iterations);
            }
            if width.is_some() || height.is_some() {
                let w = width.unwrap_or(analysis.hierarchical.canvas.width);
                let h = height.unwrap_or(analysis.hierarchical.canvas.height);
                analysis.hierarchical = analysis.hierarchical.with_canvas(w, h);
                let w = width.unwrap_or(analysis.force.canvas.width);
                let h = height.unwrap_or(analysis.force.canvas.height);
                analysis.force = analysis.force.with_canvas(w, h);
            }
            if let Some(top) = top {
                analysis.top_n = top;
            }

            let args = AnalyzeArgs {
                input,
                format,
                output_json: output,
                output_callgraph: callgraph,
                output_flamegraph: flamegraph,
                output_folded: folded,
                period_ns,
                title,
                print_summary: summary,
                config: analysis,
            };

            // Validate args first
            validate_args(&args)?;

            execute_analyze(args)?;
        }

        Commands::Top {
            input,
            format,
            count,
            policy,
            sort,
            period_ns,
        } => {
            let mut config = AnalysisConfig::default().with_policy(policy);
            config.top_n = count;

            let args = TopArgs {
                input,
                format,
                period_ns,
                sort,
                config,
            };

            validate_top_args(&args)?;
            execute_top(args)?;
        }

        Commands::Validate { file } => {
            validate_report_file(&file)?;
        }

        Commands::Schema { show } => {
            display_schema(show);
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
