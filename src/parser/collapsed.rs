//! Decoder for folded (collapsed) stack text.
//!
//! Format: one stack per line, `outer;middle;inner <weight>`, as produced by
//! `stackcollapse-*` scripts and `inferno-collapse-*`. Blank lines and `#`
//! comments are ignored. Folded stacks carry no function/location tables, so
//! each distinct frame name becomes one function with one location, and the
//! sampling period comes from configuration.

use super::schema::{
    FrameOrder, FunctionInfo, Line, Location, PeriodUnit, Profile, Sample, SourceFormat,
};
use crate::utils::error::ParseError;
use log::{debug, warn};
use std::collections::HashMap;

/// Parse folded stacks into a `Profile`
///
/// **Public** - main entry point for folded-stack input
///
/// # Arguments
/// * `text` - Folded stack text
/// * `period_ns` - Sampling period to attach, in nanoseconds
///
/// Malformed lines are skipped with a warning; they never fail the parse.
pub fn parse_collapsed(text: &str, period_ns: u64) -> Result<Profile, ParseError> {
    let mut profile = Profile::new(SourceFormat::Collapsed, FrameOrder::RootFirst);
    profile.period = period_ns;
    profile.period_unit = PeriodUnit::Nanoseconds;

    let mut ids: HashMap<String, u64> = HashMap::new();
    let mut skipped = 0usize;

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((stack_str, weight)) = split_weight(line) else {
            debug!("Skipping malformed folded line {}: {}", line_no + 1, line);
            skipped += 1;
            continue;
        };

        let mut location_ids = Vec::new();
        for frame in stack_str.split(';').map(str::trim).filter(|f| !f.is_empty()) {
            let next_id = ids.len() as u64 + 1;
            let id = *ids.entry(frame.to_string()).or_insert_with(|| {
                profile.functions.insert(
                    next_id,
                    FunctionInfo {
                        id: next_id,
                        name: frame.to_string(),
                        file: None,
                    },
                );
                profile.locations.insert(
                    next_id,
                    Location {
                        id: next_id,
                        lines: vec![Line {
                            function_id: next_id,
                            line: 0,
                        }],
                    },
                );
                next_id
            });
            location_ids.push(id);
        }

        if location_ids.is_empty() {
            skipped += 1;
            continue;
        }

        profile.samples.push(Sample::new(location_ids, weight));
    }

    if skipped > 0 {
        warn!("Skipped {} malformed folded-stack lines", skipped);
    }

    debug!(
        "Decoded {} folded stacks over {} distinct frames",
        profile.samples.len(),
        profile.functions.len()
    );

    Ok(profile)
}

/// Split `"a;b;c 42"` into the stack text and its weight
fn split_weight(line: &str) -> Option<(&str, i64)> {
    let (pos, sep) = line.char_indices().rev().find(|(_, c)| c.is_whitespace())?;
    let weight = line[pos + sep.len_utf8()..].trim().parse::<i64>().ok()?;
    let stack = line[..pos].trim();
    if stack.is_empty() {
        None
    } else {
        Some((stack, weight))
    }
}
