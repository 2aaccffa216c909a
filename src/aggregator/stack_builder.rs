//! Resolve samples into function-name stacks.
//!
//! Each sample's location ids are mapped through the location table (first
//! line record only) and the function table to a function name. Names are
//! interned into dense `FunctionId`s so every later stage works on integers.
//!
//! Resolved stacks are stored innermost-first regardless of the decoder's
//! native order; the native order is remembered for the `top` self-time
//! policy.
//!
//! Collapsed stacks ("outer;middle;inner weight") are derived from resolved
//! stacks for folded output and hot-path ranking.

use crate::parser::{FrameOrder, Profile, Sample};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Dense integer handle for an interned function name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FunctionId(pub u32);

impl FunctionId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Bidirectional name <-> id table
#[derive(Debug, Clone, Default)]
pub struct FunctionInterner {
    names: Vec<String>,
    index: HashMap<String, FunctionId>,
}

impl FunctionInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id for `name`, allocating one on first sight
    pub fn intern(&mut self, name: &str) -> FunctionId {
        if let Some(id) = self.index.get(name) {
            return *id;
        }
        let id = FunctionId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), id);
        id
    }

    pub fn get(&self, name: &str) -> Option<FunctionId> {
        self.index.get(name).copied()
    }

    /// Display name for an id. Ids always come from this interner.
    pub fn name(&self, id: FunctionId) -> &str {
        self.names.get(id.index()).map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FunctionId, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, n)| (FunctionId(i as u32), n.as_str()))
    }
}

/// One sample after resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStack {
    /// Innermost frame first
    frames: Vec<FunctionId>,
    weight: u64,
    native_order: FrameOrder,
}

impl ResolvedStack {
    /// `frames` must be innermost-first
    pub fn new(frames: Vec<FunctionId>, weight: u64, native_order: FrameOrder) -> Self {
        Self {
            frames,
            weight,
            native_order,
        }
    }

    pub fn frames(&self) -> &[FunctionId] {
        &self.frames
    }

    pub fn weight(&self) -> u64 {
        self.weight
    }

    pub fn native_order(&self) -> FrameOrder {
        self.native_order
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn innermost(&self) -> Option<FunctionId> {
        self.frames.first().copied()
    }

    pub fn outermost(&self) -> Option<FunctionId> {
        self.frames.last().copied()
    }

    /// First frame in the decoder's native order
    pub fn native_first(&self) -> Option<FunctionId> {
        match self.native_order {
            FrameOrder::LeafFirst => self.innermost(),
            FrameOrder::RootFirst => self.outermost(),
        }
    }

    /// Frames from the outermost caller down to the executing function
    pub fn outermost_first(&self) -> impl Iterator<Item = FunctionId> + '_ {
        self.frames.iter().rev().copied()
    }

    /// Adjacent `(caller, callee)` pairs; self-calls are included
    pub fn call_pairs(&self) -> impl Iterator<Item = (FunctionId, FunctionId)> + '_ {
        self.frames.windows(2).map(|w| (w[1], w[0]))
    }
}

/// All resolved stacks of a profile plus the name table they share
#[derive(Debug, Clone, Default)]
pub struct ResolvedProfile {
    pub interner: FunctionInterner,
    pub stacks: Vec<ResolvedStack>,

    /// Frames dropped because their location or function did not resolve
    pub skipped_frames: usize,

    /// Samples dropped because nothing in them resolved or they had no value
    pub skipped_samples: usize,
}

impl ResolvedProfile {
    /// Sum of weights of all non-empty resolved stacks
    pub fn total_weight(&self) -> u64 {
        self.stacks.iter().map(|s| s.weight).sum()
    }

    pub fn name(&self, id: FunctionId) -> &str {
        self.interner.name(id)
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }
}

/// Resolve one sample into innermost-first function ids
///
/// **Public** - single-sample entry point (the resolver proper)
///
/// Returns `None` when the sample has no value or no frame resolves; such
/// samples are excluded from every aggregate. `skipped_frames` is
/// incremented for each frame that could not be resolved.
pub fn resolve_stack(
    sample: &Sample,
    profile: &Profile,
    interner: &mut FunctionInterner,
    skipped_frames: &mut usize,
) -> Option<ResolvedStack> {
    let weight = sample.weight()?;
    if let Some(raw) = sample.values.first().filter(|v| **v < 0) {
        debug!("Clamping negative sample weight {} to 0", raw);
    }

    let mut frames: Vec<FunctionId> = sample
        .location_ids
        .iter()
        .filter_map(|&loc_id| {
            let name = profile
                .location(loc_id)
                .and_then(|loc| loc.first_line())
                .and_then(|line| profile.function(line.function_id))
                .map(|func| func.name.as_str());
            if name.is_none() {
                *skipped_frames += 1;
            }
            name
        })
        .map(|name| interner.intern(name))
        .collect();

    if frames.is_empty() {
        return None;
    }

    if profile.frame_order == FrameOrder::RootFirst {
        frames.reverse();
    }

    Some(ResolvedStack::new(frames, weight, profile.frame_order))
}

/// Resolve every sample of a profile
///
/// **Public** - main entry point for stack resolution
///
/// Never fails: unresolvable frames and samples are counted and skipped.
pub fn resolve_stacks(profile: &Profile) -> ResolvedProfile {
    debug!("Resolving {} samples", profile.samples.len());

    let mut resolved = ResolvedProfile::default();

    for sample in &profile.samples {
        match resolve_stack(
            sample,
            profile,
            &mut resolved.interner,
            &mut resolved.skipped_frames,
        ) {
            Some(stack) => resolved.stacks.push(stack),
            None => resolved.skipped_samples += 1,
        }
    }

    if resolved.skipped_frames > 0 || resolved.skipped_samples > 0 {
        warn!(
            "Skipped {} unresolvable frames and {} empty samples",
            resolved.skipped_frames, resolved.skipped_samples
        );
    }

    debug!(
        "Resolved {} stacks over {} distinct functions",
        resolved.stacks.len(),
        resolved.interner.len()
    );

    resolved
}

/// A single collapsed stack entry
///
/// **Public** - used for folded output and hot-path ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollapsedStack {
    /// Stack trace as semicolon-separated string, outermost first
    pub stack: String,

    /// Summed weight of every sample with this exact stack
    pub weight: u64,
}

impl CollapsedStack {
    pub fn new(stack: String, weight: u64) -> Self {
        Self { stack, weight }
    }

    /// Render as a folded-format line
    pub fn to_line(&self) -> String {
        format!("{} {}", self.stack, self.weight)
    }

    /// Innermost function of the stack
    pub fn leaf(&self) -> &str {
        self.stack.split(';').next_back().unwrap_or(&self.stack)
    }
}

/// Merge identical stacks and render them outermost-first
///
/// Sorted by weight descending, then stack text for determinism.
pub fn build_collapsed_stacks(resolved: &ResolvedProfile) -> Vec<CollapsedStack> {
    let mut stack_map: HashMap<String, u64> = HashMap::new();

    for stack in &resolved.stacks {
        let key = stack
            .outermost_first()
            .map(|id| resolved.name(id))
            .collect::<Vec<_>>()
            .join(";");
        *stack_map.entry(key).or_insert(0) += stack.weight();
    }

    let mut stacks: Vec<CollapsedStack> = stack_map
        .into_iter()
        .map(|(stack, weight)| CollapsedStack::new(stack, weight))
        .collect();

    stacks.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.stack.cmp(&b.stack)));
    debug!("Built {} unique collapsed stacks", stacks.len());

    stacks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{FunctionInfo, Line, Location, SourceFormat};

    fn profile_with(functions: &[(u64, &str)], locations: &[(u64, Option<u64>)]) -> Profile {
        let mut profile = Profile::new(SourceFormat::Pprof, FrameOrder::LeafFirst);
        for (id, name) in functions {
            profile.functions.insert(
                *id,
                FunctionInfo {
                    id: *id,
                    name: name.to_string(),
                    file: None,
                },
            );
        }
        for (id, func) in locations {
            profile.locations.insert(
                *id,
                Location {
                    id: *id,
                    lines: func
                        .map(|f| {
                            vec![Line {
                                function_id: f,
                                line: 1,
                            }]
                        })
                        .unwrap_or_default(),
                },
            );
        }
        profile
    }

    #[test]
    fn test_interner_is_stable() {
        let mut interner = FunctionInterner::new();
        let a = interner.intern("a");
        let b = interner.intern("b");
        assert_eq!(interner.intern("a"), a);
        assert_ne!(a, b);
        assert_eq!(interner.name(b), "b");
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn test_lineless_location_is_omitted() {
        let profile = profile_with(&[(1, "leaf"), (2, "main")], &[(1, Some(1)), (2, None), (3, Some(2))]);
        let mut interner = FunctionInterner::new();
        let mut skipped = 0;

        let stack = resolve_stack(&Sample::new(vec![1, 2, 3], 4), &profile, &mut interner, &mut skipped)
            .unwrap();

        assert_eq!(skipped, 1);
        assert_eq!(stack.depth(), 2);
        assert_eq!(interner.name(stack.innermost().unwrap()), "leaf");
        assert_eq!(interner.name(stack.outermost().unwrap()), "main");
    }

    #[test]
    fn test_out_of_range_ids_skip_frame() {
        let profile = profile_with(&[(1, "f")], &[(1, Some(1)), (2, Some(99))]);
        let mut interner = FunctionInterner::new();
        let mut skipped = 0;

        let stack = resolve_stack(&Sample::new(vec![42, 2, 1], 1), &profile, &mut interner, &mut skipped)
            .unwrap();

        assert_eq!(skipped, 2);
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_negative_weight_clamped() {
        let profile = profile_with(&[(1, "f")], &[(1, Some(1))]);
        let mut interner = FunctionInterner::new();
        let mut skipped = 0;

        let stack = resolve_stack(&Sample::new(vec![1], -7), &profile, &mut interner, &mut skipped)
            .unwrap();

        assert_eq!(stack.weight(), 0);
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_empty_stack_excluded() {
        let mut profile = profile_with(&[], &[(1, None)]);
        profile.samples.push(Sample::new(vec![1], 10));
        profile.samples.push(Sample::new(vec![], 10));

        let resolved = resolve_stacks(&profile);
        assert!(resolved.is_empty());
        assert_eq!(resolved.skipped_samples, 2);
        assert_eq!(resolved.total_weight(), 0);
    }

    #[test]
    fn test_root_first_input_is_normalised() {
        let mut profile = profile_with(&[(1, "main"), (2, "work")], &[(1, Some(1)), (2, Some(2))]);
        profile.frame_order = FrameOrder::RootFirst;
        profile.samples.push(Sample::new(vec![1, 2], 3));

        let resolved = resolve_stacks(&profile);
        let stack = &resolved.stacks[0];
        assert_eq!(resolved.name(stack.innermost().unwrap()), "work");
        assert_eq!(resolved.name(stack.native_first().unwrap()), "main");

        let pairs: Vec<_> = stack.call_pairs().collect();
        assert_eq!(pairs, vec![(stack.frames()[1], stack.frames()[0])]);
    }

    #[test]
    fn test_build_collapsed_stacks_merges() {
        let mut profile = profile_with(&[(1, "leaf"), (2, "main")], &[(1, Some(1)), (2, Some(2))]);
        profile.samples.push(Sample::new(vec![1, 2], 3));
        profile.samples.push(Sample::new(vec![1, 2], 4));
        profile.samples.push(Sample::new(vec![2], 1));

        let stacks = build_collapsed_stacks(&resolve_stacks(&profile));
        assert_eq!(stacks.len(), 2);
        assert_eq!(stacks[0].to_line(), "main;leaf 7");
        assert_eq!(stacks[0].leaf(), "leaf");
        assert_eq!(stacks[1].to_line(), "main 1");
    }
}
