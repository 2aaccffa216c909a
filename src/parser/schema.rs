//! Input profile model shared by all decoders.
//!
//! This is the generic sample/stack model: a function table, a location
//! table, weighted samples referencing locations, and a sampling period.
//! Decoders produce it; the aggregator only ever reads it.

use crate::utils::config::NON_NANOSECOND_SCALE;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which decoder produced a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Pprof,
    Collapsed,
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Pprof => write!(f, "pprof"),
            SourceFormat::Collapsed => write!(f, "collapsed"),
        }
    }
}

impl std::str::FromStr for SourceFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pprof" | "json" => Ok(SourceFormat::Pprof),
            "collapsed" | "folded" => Ok(SourceFormat::Collapsed),
            other => Err(format!("unknown input format '{}' (expected pprof or collapsed)", other)),
        }
    }
}

/// Native order of location ids within a sample
///
/// pprof lists the innermost (currently executing) frame first; folded
/// stacks list the outermost frame first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameOrder {
    #[default]
    LeafFirst,
    RootFirst,
}

/// Unit of the sampling period
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PeriodUnit {
    #[default]
    Nanoseconds,
    Other(String),
}

impl PeriodUnit {
    pub fn from_label(label: &str) -> Self {
        if label == "nanoseconds" {
            PeriodUnit::Nanoseconds
        } else {
            PeriodUnit::Other(label.to_string())
        }
    }

    /// Multiplier that converts one period unit to nanoseconds
    pub fn nanos_scale(&self) -> u64 {
        match self {
            PeriodUnit::Nanoseconds => 1,
            PeriodUnit::Other(_) => NON_NANOSECOND_SCALE,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            PeriodUnit::Nanoseconds => "nanoseconds",
            PeriodUnit::Other(label) => label,
        }
    }
}

/// Function table entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub id: u64,
    pub name: String,
    pub file: Option<String>,
}

/// One line record of a location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub function_id: u64,
    pub line: i64,
}

/// Location table entry; only the first line record is ever consulted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: u64,
    pub lines: Vec<Line>,
}

impl Location {
    pub fn first_line(&self) -> Option<&Line> {
        self.lines.first()
    }
}

/// A weighted stack sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Location ids in the profile's native `FrameOrder`
    pub location_ids: Vec<u64>,

    /// Sample values; `values[0]` is the weight
    pub values: Vec<i64>,
}

impl Sample {
    pub fn new(location_ids: Vec<u64>, weight: i64) -> Self {
        Self {
            location_ids,
            values: vec![weight],
        }
    }

    /// Weight of the sample, `None` if it carries no values.
    /// Negative weights clamp to zero.
    pub fn weight(&self) -> Option<u64> {
        self.values.first().map(|v| (*v).max(0) as u64)
    }
}

/// Decoded profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub format: SourceFormat,
    pub frame_order: FrameOrder,
    pub functions: BTreeMap<u64, FunctionInfo>,
    pub locations: BTreeMap<u64, Location>,
    pub samples: Vec<Sample>,

    /// Sampling period in `period_unit`
    pub period: u64,
    pub period_unit: PeriodUnit,

    /// Wall-clock duration reported by the profiler, if any
    pub duration_nanos: Option<u64>,
}

impl Profile {
    pub fn new(format: SourceFormat, frame_order: FrameOrder) -> Self {
        Self {
            format,
            frame_order,
            functions: BTreeMap::new(),
            locations: BTreeMap::new(),
            samples: Vec::new(),
            period: 0,
            period_unit: PeriodUnit::default(),
            duration_nanos: None,
        }
    }

    pub fn function(&self, id: u64) -> Option<&FunctionInfo> {
        self.functions.get(&id)
    }

    pub fn location(&self, id: u64) -> Option<&Location> {
        self.locations.get(&id)
    }

    /// Sampling period converted to nanoseconds
    pub fn period_nanos(&self) -> u64 {
        self.period.saturating_mul(self.period_unit.nanos_scale())
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_unit_scaling() {
        assert_eq!(PeriodUnit::from_label("nanoseconds").nanos_scale(), 1);
        assert_eq!(PeriodUnit::from_label("microseconds").nanos_scale(), 1_000);
        assert_eq!(PeriodUnit::from_label("count").label(), "count");
    }

    #[test]
    fn test_sample_weight() {
        assert_eq!(Sample::new(vec![1], 7).weight(), Some(7));
        assert_eq!(Sample::new(vec![1], -3).weight(), Some(0));

        let empty = Sample {
            location_ids: vec![1],
            values: vec![],
        };
        assert_eq!(empty.weight(), None);
    }

    #[test]
    fn test_period_nanos() {
        let mut profile = Profile::new(SourceFormat::Pprof, FrameOrder::LeafFirst);
        profile.period = 10;
        profile.period_unit = PeriodUnit::from_label("microseconds");
        assert_eq!(profile.period_nanos(), 10_000);
    }
}
