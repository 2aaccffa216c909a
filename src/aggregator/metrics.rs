//! Hot-function rankings and weight statistics.
//!
//! Hot functions are ranked the way `pprof -top` ranks them: flat (self)
//! weight first, with a running `sum%` column. Hot paths are the heaviest
//! distinct stacks.

use super::stack_builder::{CollapsedStack, FunctionInterner};
use super::timing::{SamplingClock, TimingTable};
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Ranking column for hot-function tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Flat,
    Cum,
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flat" => Ok(SortKey::Flat),
            "cum" => Ok(SortKey::Cum),
            other => Err(format!("unknown sort key '{}' (expected flat or cum)", other)),
        }
    }
}

/// One row of a hot-function table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotFunction {
    pub name: String,
    pub flat_weight: u64,
    pub flat_seconds: f64,
    pub flat_percent: f64,

    /// Running total of `flat_percent` down the table
    pub sum_percent: f64,
    pub cum_weight: u64,
    pub cum_seconds: f64,
    pub cum_percent: f64,
}

/// A heavy distinct stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotPath {
    /// Outermost-first, semicolon separated
    pub stack: String,
    pub weight: u64,
    pub percentage: f64,
}

/// Rank functions and keep the top `top_n`
///
/// **Public** - main entry point for metrics calculation
///
/// # Arguments
/// * `timing` - Aggregated timing table
/// * `interner` - Names for the table's ids
/// * `clock` - Shared conversion to seconds and percent
/// * `top_n` - Number of rows to return
/// * `sort` - Primary ranking column; ties fall back to the other column, then name
pub fn calculate_hot_functions(
    timing: &TimingTable,
    interner: &FunctionInterner,
    clock: &SamplingClock,
    top_n: usize,
    sort: SortKey,
) -> Vec<HotFunction> {
    debug!(
        "Ranking top {} of {} functions by {:?}",
        top_n,
        timing.len(),
        sort
    );

    let mut rows: Vec<(u64, u64, &str)> = timing
        .functions()
        .map(|id| (timing.self_weight(id), timing.cum_weight(id), interner.name(id)))
        .collect();

    rows.sort_by(|a, b| {
        let primary = match sort {
            SortKey::Flat => b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)),
            SortKey::Cum => b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)),
        };
        match primary {
            Ordering::Equal => a.2.cmp(b.2),
            other => other,
        }
    });

    let mut running = 0.0;
    rows.into_iter()
        .take(top_n)
        .map(|(flat, cum, name)| {
            let flat_percent = clock.percent(flat);
            running += flat_percent;
            HotFunction {
                name: name.to_string(),
                flat_weight: flat,
                flat_seconds: clock.seconds(flat),
                flat_percent,
                sum_percent: running,
                cum_weight: cum,
                cum_seconds: clock.seconds(cum),
                cum_percent: clock.percent(cum),
            }
        })
        .collect()
}

/// Heaviest distinct stacks
///
/// `stacks` must already be sorted by weight, as `build_collapsed_stacks`
/// returns them.
pub fn calculate_hot_paths(
    stacks: &[CollapsedStack],
    clock: &SamplingClock,
    top_n: usize,
) -> Vec<HotPath> {
    stacks
        .iter()
        .take(top_n)
        .map(|stack| HotPath {
            stack: stack.stack.clone(),
            weight: stack.weight,
            percentage: clock.percent(stack.weight),
        })
        .collect()
}

/// Calculate weight distribution statistics over distinct stacks
///
/// **Public** - provides summary statistics
pub fn calculate_weight_distribution(stacks: &[CollapsedStack]) -> WeightDistribution {
    if stacks.is_empty() {
        return WeightDistribution::default();
    }

    let total: u64 = stacks.iter().map(|s| s.weight).sum();
    let count = stacks.len();

    let mut weights: Vec<u64> = stacks.iter().map(|s| s.weight).collect();
    weights.sort_unstable_by(|a, b| b.cmp(a));
    let median = weights[weights.len() / 2];

    let top_count = (count as f64 * 0.1).ceil() as usize;
    let top_weight: u64 = weights.iter().take(top_count).sum();

    WeightDistribution {
        total_weight: total,
        stack_count: count,
        mean_weight_per_stack: total / count as u64,
        median_weight_per_stack: median,
        top_10_percent_weight: top_weight,
        top_10_percent_percentage: if total > 0 {
            (top_weight as f64 / total as f64) * 100.0
        } else {
            0.0
        },
    }
}

/// Weight distribution statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightDistribution {
    pub total_weight: u64,

    /// Number of distinct stacks
    pub stack_count: usize,
    pub mean_weight_per_stack: u64,
    pub median_weight_per_stack: u64,

    /// Weight of the heaviest 10% of stacks
    pub top_10_percent_weight: u64,
    pub top_10_percent_percentage: f64,
}

impl WeightDistribution {
    /// True if the heaviest 10% of stacks carry more than 80% of the weight
    pub fn is_highly_concentrated(&self) -> bool {
        self.top_10_percent_percentage > 80.0
    }

    /// Get human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "Total: {} | Stacks: {} | Mean: {} | Median: {} | Top 10%: {:.1}%",
            self.total_weight,
            self.stack_count,
            self.mean_weight_per_stack,
            self.median_weight_per_stack,
            self.top_10_percent_percentage
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::stack_builder::ResolvedStack;
    use crate::parser::FrameOrder;

    fn clock(total: u64) -> SamplingClock {
        SamplingClock::from_parts(1_000_000, total, total as f64 * 1_000_000.0)
    }

    #[test]
    fn test_hot_functions_pprof_top_columns() {
        let mut interner = FunctionInterner::new();
        let main = interner.intern("main");
        let pow = interner.intern("math.pow");
        let tan = interner.intern("math.tan");

        let mut timing = TimingTable::new();
        for (frames, w) in [(vec![pow, main], 6), (vec![tan, main], 3), (vec![main], 1)] {
            timing.record(
                &ResolvedStack::new(frames, w, FrameOrder::LeafFirst),
                crate::aggregator::SelfTimePolicy::Leaf,
            );
        }

        let rows = calculate_hot_functions(&timing, &interner, &clock(10), 2, SortKey::Flat);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "math.pow");
        assert_eq!(rows[0].flat_percent, 60.0);
        assert_eq!(rows[1].name, "math.tan");
        assert_eq!(rows[1].sum_percent, 90.0);

        let by_cum = calculate_hot_functions(&timing, &interner, &clock(10), 1, SortKey::Cum);
        assert_eq!(by_cum[0].name, "main");
        assert_eq!(by_cum[0].cum_weight, 10);
        assert_eq!(by_cum[0].flat_weight, 1);
        assert!((by_cum[0].cum_seconds - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_calculate_hot_paths() {
        let stacks = vec![
            CollapsedStack::new("main;execute".to_string(), 5000),
            CollapsedStack::new("main;storage".to_string(), 3000),
            CollapsedStack::new("main;compute".to_string(), 2000),
        ];

        let hot_paths = calculate_hot_paths(&stacks, &clock(10000), 2);

        assert_eq!(hot_paths.len(), 2);
        assert_eq!(hot_paths[0].stack, "main;execute");
        assert_eq!(hot_paths[0].percentage, 50.0);
    }

    #[test]
    fn test_weight_distribution() {
        let stacks = vec![
            CollapsedStack::new("stack1".to_string(), 8000),
            CollapsedStack::new("stack2".to_string(), 1000),
            CollapsedStack::new("stack3".to_string(), 500),
            CollapsedStack::new("stack4".to_string(), 500),
        ];

        let dist = calculate_weight_distribution(&stacks);

        assert_eq!(dist.total_weight, 10000);
        assert_eq!(dist.stack_count, 4);
        assert_eq!(dist.mean_weight_per_stack, 2500);
        assert!(!dist.is_highly_concentrated());
        assert_eq!(dist.top_10_percent_percentage, 80.0);
    }

    #[test]
    fn test_weight_distribution_empty() {
        let dist = calculate_weight_distribution(&[]);
        assert_eq!(dist, WeightDistribution::default());
    }
}
