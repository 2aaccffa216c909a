//! Self and cumulative time attribution.
//!
//! Weights stay in raw sample units until presentation; `SamplingClock`
//! converts them to seconds and percentages with one shared denominator so
//! every number in a report agrees with every other.

use super::stack_builder::{FunctionId, ResolvedProfile, ResolvedStack};
use crate::graph::CallGraph;
use crate::parser::Profile;
use crate::utils::config::NANOS_PER_SECOND;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// How a sample's weight is charged as self time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelfTimePolicy {
    /// Innermost frame of the stack
    Leaf,

    /// First frame in the decoder's native order
    #[default]
    Top,

    /// Every distinct frame gets the full weight; for diagnostics only
    Uniform,
}

impl fmt::Display for SelfTimePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelfTimePolicy::Leaf => write!(f, "leaf"),
            SelfTimePolicy::Top => write!(f, "top"),
            SelfTimePolicy::Uniform => write!(f, "uniform"),
        }
    }
}

impl FromStr for SelfTimePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "leaf" => Ok(SelfTimePolicy::Leaf),
            "top" => Ok(SelfTimePolicy::Top),
            "uniform" => Ok(SelfTimePolicy::Uniform),
            other => Err(format!(
                "unknown self-time policy '{}' (expected leaf, top or uniform)",
                other
            )),
        }
    }
}

/// Per-function self and cumulative weight
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimingTable {
    self_weight: BTreeMap<FunctionId, u64>,
    cum_weight: BTreeMap<FunctionId, u64>,
    total_weight: u64,
}

impl TimingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Charge one stack under `policy`
    ///
    /// Cumulative weight is charged once per distinct function, so recursion
    /// never counts a sample twice.
    pub fn record(&mut self, stack: &ResolvedStack, policy: SelfTimePolicy) {
        let weight = stack.weight();
        let distinct: BTreeSet<FunctionId> = stack.frames().iter().copied().collect();

        for id in &distinct {
            *self.cum_weight.entry(*id).or_insert(0) += weight;
        }

        match policy {
            SelfTimePolicy::Leaf => {
                if let Some(id) = stack.innermost() {
                    *self.self_weight.entry(id).or_insert(0) += weight;
                }
            }
            SelfTimePolicy::Top => {
                if let Some(id) = stack.native_first() {
                    *self.self_weight.entry(id).or_insert(0) += weight;
                }
            }
            SelfTimePolicy::Uniform => {
                for id in &distinct {
                    *self.self_weight.entry(*id).or_insert(0) += weight;
                }
            }
        }

        self.total_weight += weight;
    }

    /// Combine two partial tables; addition is commutative and associative
    pub fn merge(&mut self, other: &TimingTable) {
        for (id, w) in &other.self_weight {
            *self.self_weight.entry(*id).or_insert(0) += w;
        }
        for (id, w) in &other.cum_weight {
            *self.cum_weight.entry(*id).or_insert(0) += w;
        }
        self.total_weight += other.total_weight;
    }

    pub fn self_weight(&self, id: FunctionId) -> u64 {
        self.self_weight.get(&id).copied().unwrap_or(0)
    }

    pub fn cum_weight(&self, id: FunctionId) -> u64 {
        self.cum_weight.get(&id).copied().unwrap_or(0)
    }

    /// Sum of weights of every recorded stack
    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    /// Sum of self weight across all functions
    pub fn total_self_weight(&self) -> u64 {
        self.self_weight.values().sum()
    }

    pub fn max_cum_weight(&self) -> u64 {
        self.cum_weight.values().copied().max().unwrap_or(0)
    }

    /// Every function seen in any stack, in id order
    pub fn functions(&self) -> impl Iterator<Item = FunctionId> + '_ {
        self.cum_weight.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.cum_weight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cum_weight.is_empty()
    }
}

/// Converts raw weights into wall time and percentages
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingClock {
    /// Sampling period in nanoseconds (0 if unknown)
    pub period_nanos: u64,

    /// Total resolved weight as seen in the profile
    pub total_weight: u64,

    /// Wall time represented by all samples, in nanoseconds
    pub total_nanos: f64,

    /// Seconds represented by one unit of weight
    pub seconds_per_sample: f64,
}

impl SamplingClock {
    /// Derive the clock for a profile whose resolved stacks weigh `total_weight`
    ///
    /// Total duration is `total_weight * period`; when the profile has no
    /// period the reported `duration_nanos` is used instead.
    pub fn new(profile: &Profile, total_weight: u64) -> Self {
        let period_nanos = profile.period_nanos();
        let total_nanos = if period_nanos > 0 {
            total_weight as f64 * period_nanos as f64
        } else {
            profile.duration_nanos.unwrap_or(0) as f64
        };

        let clock = Self::from_parts(period_nanos, total_weight, total_nanos);
        debug!(
            "Sampling clock: period {} ns, {} total weight, {:.6} s/sample",
            period_nanos, total_weight, clock.seconds_per_sample
        );
        clock
    }

    pub fn from_parts(period_nanos: u64, total_weight: u64, total_nanos: f64) -> Self {
        let denominator = if total_weight == 0 {
            warn!("Total sample weight is zero; using 1 as the denominator");
            1
        } else {
            total_weight
        };

        Self {
            period_nanos,
            total_weight,
            total_nanos,
            seconds_per_sample: total_nanos / NANOS_PER_SECOND / denominator as f64,
        }
    }

    /// Percentage denominator, never zero
    pub fn denominator(&self) -> u64 {
        self.total_weight.max(1)
    }

    pub fn seconds(&self, weight: u64) -> f64 {
        weight as f64 * self.seconds_per_sample
    }

    pub fn millis(&self, weight: u64) -> f64 {
        self.seconds(weight) * 1_000.0
    }

    pub fn percent(&self, weight: u64) -> f64 {
        100.0 * weight as f64 / self.denominator() as f64
    }

    pub fn total_seconds(&self) -> f64 {
        self.total_nanos / NANOS_PER_SECOND
    }

    /// Samples per second, if the period is known
    pub fn sampling_rate_hz(&self) -> Option<f64> {
        (self.period_nanos > 0).then(|| NANOS_PER_SECOND / self.period_nanos as f64)
    }
}

/// Everything the aggregation pass produces
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub policy: SelfTimePolicy,
    pub timing: TimingTable,

    /// Raw, unpruned call edges
    pub graph: CallGraph,
    pub clock: SamplingClock,
}

/// Build a timing table for a set of stacks
pub fn aggregate_timing(stacks: &[ResolvedStack], policy: SelfTimePolicy) -> TimingTable {
    let mut table = TimingTable::new();
    for stack in stacks {
        table.record(stack, policy);
    }
    table
}

/// Run the aggregation pass over resolved stacks
///
/// **Public** - main entry point for timing attribution
///
/// # Arguments
/// * `profile` - Source profile (for the sampling period)
/// * `resolved` - Output of `resolve_stacks`
/// * `policy` - Self-time attribution policy
pub fn aggregate(
    profile: &Profile,
    resolved: &ResolvedProfile,
    policy: SelfTimePolicy,
) -> Aggregation {
    info!(
        "Aggregating {} stacks with '{}' self-time policy",
        resolved.stacks.len(),
        policy
    );

    if policy == SelfTimePolicy::Uniform {
        warn!("'uniform' self time charges every frame in full; totals will exceed 100%");
    }

    let timing = aggregate_timing(&resolved.stacks, policy);
    let graph = CallGraph::from_stacks(&resolved.stacks);
    let clock = SamplingClock::new(profile, timing.total_weight());

    debug!(
        "Aggregated {} functions and {} raw call edges",
        timing.len(),
        graph.edge_count()
    );

    Aggregation {
        policy,
        timing,
        graph,
        clock,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{FrameOrder, SourceFormat};

    fn stack(frames: &[u32], weight: u64, order: FrameOrder) -> ResolvedStack {
        ResolvedStack::new(frames.iter().map(|n| FunctionId(*n)).collect(), weight, order)
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("LEAF".parse::<SelfTimePolicy>(), Ok(SelfTimePolicy::Leaf));
        assert_eq!(SelfTimePolicy::default(), SelfTimePolicy::Top);
        assert!("bottom".parse::<SelfTimePolicy>().is_err());
    }

    #[test]
    fn test_recursion_counted_once() {
        let mut table = TimingTable::new();
        table.record(&stack(&[1, 1, 0], 4, FrameOrder::LeafFirst), SelfTimePolicy::Leaf);

        assert_eq!(table.cum_weight(FunctionId(1)), 4);
        assert_eq!(table.self_weight(FunctionId(1)), 4);
        assert_eq!(table.cum_weight(FunctionId(0)), 4);
    }

    #[test]
    fn test_top_follows_native_order() {
        // innermost-first frames [leaf, main]
        let leaf_first = stack(&[1, 0], 3, FrameOrder::LeafFirst);
        let root_first = stack(&[1, 0], 3, FrameOrder::RootFirst);

        let a = aggregate_timing(&[leaf_first], SelfTimePolicy::Top);
        let b = aggregate_timing(&[root_first], SelfTimePolicy::Top);

        assert_eq!(a.self_weight(FunctionId(1)), 3);
        assert_eq!(b.self_weight(FunctionId(0)), 3);
    }

    #[test]
    fn test_uniform_exceeds_total() {
        let table = aggregate_timing(&[stack(&[1, 0], 5, FrameOrder::LeafFirst)], SelfTimePolicy::Uniform);
        assert_eq!(table.total_weight(), 5);
        assert_eq!(table.total_self_weight(), 10);
    }

    #[test]
    fn test_merge_matches_single_pass() {
        let stacks = vec![
            stack(&[1, 0], 5, FrameOrder::LeafFirst),
            stack(&[2, 0], 3, FrameOrder::LeafFirst),
            stack(&[0], 2, FrameOrder::LeafFirst),
        ];

        let whole = aggregate_timing(&stacks, SelfTimePolicy::Leaf);
        let mut left = aggregate_timing(&stacks[..1], SelfTimePolicy::Leaf);
        let right = aggregate_timing(&stacks[1..], SelfTimePolicy::Leaf);
        left.merge(&right);

        assert_eq!(left, whole);
    }

    #[test]
    fn test_clock_conversions() {
        let mut profile = Profile::new(SourceFormat::Pprof, FrameOrder::LeafFirst);
        profile.period = 10_000_000;

        let clock = SamplingClock::new(&profile, 200);
        assert!((clock.seconds_per_sample - 0.01).abs() < 1e-12);
        assert!((clock.total_seconds() - 2.0).abs() < 1e-9);
        assert_eq!(clock.percent(50), 25.0);
        assert_eq!(clock.sampling_rate_hz(), Some(100.0));
    }

    #[test]
    fn test_clock_uses_duration_without_period() {
        let mut profile = Profile::new(SourceFormat::Pprof, FrameOrder::LeafFirst);
        profile.duration_nanos = Some(4_000_000_000);

        let clock = SamplingClock::new(&profile, 400);
        assert!((clock.seconds_per_sample - 0.01).abs() < 1e-12);
        assert_eq!(clock.sampling_rate_hz(), None);
    }

    #[test]
    fn test_zero_weight_clock_does_not_divide_by_zero() {
        let profile = Profile::new(SourceFormat::Pprof, FrameOrder::LeafFirst);
        let clock = SamplingClock::new(&profile, 0);
        assert_eq!(clock.denominator(), 1);
        assert_eq!(clock.seconds_per_sample, 0.0);
        assert_eq!(clock.percent(0), 0.0);
    }
}
