//! Configuration and constants for the analysis pipeline.
//!
//! Defaults live here as constants; an optional TOML file can override
//! them, and CLI flags override the file.

use super::error::ConfigError;
use crate::aggregator::timing::SelfTimePolicy;
use crate::graph::pruner::PruneThreshold;
use crate::layout::{ForceConfig, HierarchicalConfig, LayoutKind};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Current report schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Sampling period assumed for folded stacks, which carry no period (100 Hz)
pub const DEFAULT_PERIOD_NS: u64 = 10_000_000;

/// Functions with less cumulative wall time than this are pruned
pub const DEFAULT_THRESHOLD_SECS: f64 = 1.0;

/// Seed for the force-directed layout's initial placement
pub const DEFAULT_LAYOUT_SEED: u64 = 42;

/// Rows shown in hot-function tables
pub const DEFAULT_TOP_N: usize = 10;
pub const MAX_TOP_N: usize = 1000;

/// Period units other than nanoseconds are treated as microseconds
pub const NON_NANOSECOND_SCALE: u64 = 1_000;
pub const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// Nodes above this cumulative share are drawn as hot
pub const HOT_NODE_PERCENT: f64 = 10.0;

/// Analysis settings, loadable from TOML
///
/// Every field has a default so a config file only needs the keys it
/// wants to change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Self-time attribution policy
    pub policy: SelfTimePolicy,

    /// Prune threshold in seconds of cumulative wall time
    pub threshold_secs: Option<f64>,

    /// Prune threshold in raw sample weight (mutually exclusive with seconds)
    pub threshold_weight: Option<u64>,

    /// Period used for inputs that carry none (folded stacks)
    pub default_period_ns: u64,

    /// Which layout engine positions the call graph
    pub layout: LayoutKind,

    /// Hierarchical layout geometry
    pub hierarchical: HierarchicalConfig,

    /// Force-directed layout parameters
    pub force: ForceConfig,

    /// Number of functions in hot-function tables
    pub top_n: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            policy: SelfTimePolicy::default(),
            threshold_secs: None,
            threshold_weight: None,
            default_period_ns: DEFAULT_PERIOD_NS,
            layout: LayoutKind::default(),
            hierarchical: HierarchicalConfig::default(),
            force: ForceConfig::default(),
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl AnalysisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: SelfTimePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_layout(mut self, layout: LayoutKind) -> Self {
        self.layout = layout;
        self
    }

    /// Resolve the configured threshold, defaulting to one second
    pub fn prune_threshold(&self) -> PruneThreshold {
        match (self.threshold_weight, self.threshold_secs) {
            (Some(weight), _) => PruneThreshold::Weight(weight),
            (None, Some(secs)) => PruneThreshold::Seconds(secs),
            (None, None) => PruneThreshold::Seconds(DEFAULT_THRESHOLD_SECS),
        }
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threshold_secs.is_some() && self.threshold_weight.is_some() {
            return Err(ConfigError::InvalidValue(
                "threshold_secs and threshold_weight are mutually exclusive".to_string(),
            ));
        }

        if let Some(secs) = self.threshold_secs {
            if !secs.is_finite() || secs < 0.0 {
                return Err(ConfigError::InvalidValue(format!(
                    "threshold_secs must be a non-negative number, got {}",
                    secs
                )));
            }
        }

        if self.top_n == 0 || self.top_n > MAX_TOP_N {
            return Err(ConfigError::InvalidValue(format!(
                "top_n must be between 1 and {}",
                MAX_TOP_N
            )));
        }

        self.hierarchical.canvas.validate()?;
        self.force.canvas.validate()?;

        if self.force.min_temperature <= 0.0 {
            return Err(ConfigError::InvalidValue(
                "force.min_temperature must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Load analysis settings from a TOML file
///
/// # Errors
/// * `ConfigError::IoError` - If file cannot be read
/// * `ConfigError::TomlParseFailed` - If TOML is invalid
/// * `ConfigError::InvalidValue` - If a value is out of range
///
/// # Example
/// ```ignore
/// let config = load_config("analysis.toml")?;
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<AnalysisConfig, ConfigError> {
    let path = path.as_ref();
    debug!("Loading analysis config from: {}", path.display());

    let contents = fs::read_to_string(path)?;
    let config: AnalysisConfig = toml::from_str(&contents)?;
    config.validate()?;

    Ok(config)
}
