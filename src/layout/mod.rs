//! Call-graph layout engines.
//!
//! Both engines take a pruned `CallGraph` and produce a `LayoutResult`:
//! a position and footprint per function. Positions are node centres in
//! SVG coordinates (y grows downward).
//!
//! - `hierarchical`: longest-path levels, roots at the top
//! - `force`: seeded spring embedder

pub mod force;
pub mod hierarchical;

pub use force::{force_layout, ForceConfig};
pub use hierarchical::{assign_levels, hierarchical_layout, HierarchicalConfig};

use crate::aggregator::{FunctionId, TimingTable};
use crate::graph::CallGraph;
use crate::utils::error::ConfigError;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Drawing area in SVG units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
}

impl Canvas {
    pub fn new(width: f64, height: f64, padding: f64) -> Self {
        Self {
            width,
            height,
            padding,
        }
    }

    pub fn usable_width(&self) -> f64 {
        self.width - 2.0 * self.padding
    }

    pub fn usable_height(&self) -> f64 {
        self.height - 2.0 * self.padding
    }

    /// True if `(x, y)` lies inside the padded area
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.padding
            && x <= self.width - self.padding
            && y >= self.padding
            && y <= self.height - self.padding
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = self.width.is_finite() && self.height.is_finite() && self.padding.is_finite();
        if !finite || self.padding < 0.0 {
            return Err(ConfigError::InvalidValue(format!(
                "canvas dimensions must be finite and padding non-negative: {:?}",
                self
            )));
        }
        if self.usable_width() <= 0.0 || self.usable_height() <= 0.0 {
            return Err(ConfigError::InvalidValue(format!(
                "canvas {}x{} leaves no room inside padding {}",
                self.width, self.height, self.padding
            )));
        }
        Ok(())
    }
}

/// Which engine lays out the call graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    #[default]
    Hierarchical,
    Force,
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutKind::Hierarchical => write!(f, "hierarchical"),
            LayoutKind::Force => write!(f, "force"),
        }
    }
}

impl FromStr for LayoutKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hierarchical" | "tree" => Ok(LayoutKind::Hierarchical),
            "force" | "network" => Ok(LayoutKind::Force),
            other => Err(format!(
                "unknown layout '{}' (expected hierarchical or force)",
                other
            )),
        }
    }
}

/// Shape and size a node occupies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum Footprint {
    Box { width: f64, height: f64 },
    Circle { radius: f64 },
}

impl Footprint {
    /// Half extents along x and y
    pub fn half_size(&self) -> (f64, f64) {
        match *self {
            Footprint::Box { width, height } => (width / 2.0, height / 2.0),
            Footprint::Circle { radius } => (radius, radius),
        }
    }
}

/// Position of one function
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodePlacement {
    pub id: FunctionId,

    /// Centre of the node
    pub x: f64,
    pub y: f64,
    pub footprint: Footprint,

    /// Longest-path level; hierarchical layout only
    pub level: Option<usize>,
}

impl NodePlacement {
    /// Top edge of the footprint
    pub fn top(&self) -> f64 {
        self.y - self.footprint.half_size().1
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.footprint.half_size().1
    }

    pub fn left(&self) -> f64 {
        self.x - self.footprint.half_size().0
    }

    pub fn right(&self) -> f64 {
        self.x + self.footprint.half_size().0
    }
}

/// Positions for every node of a graph
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutResult {
    pub kind: LayoutKind,
    pub canvas: Canvas,
    placements: BTreeMap<FunctionId, NodePlacement>,
}

impl LayoutResult {
    pub fn new(kind: LayoutKind, canvas: Canvas) -> Self {
        Self {
            kind,
            canvas,
            placements: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, placement: NodePlacement) {
        self.placements.insert(placement.id, placement);
    }

    pub fn get(&self, id: FunctionId) -> Option<&NodePlacement> {
        self.placements.get(&id)
    }

    pub fn level(&self, id: FunctionId) -> Option<usize> {
        self.get(id).and_then(|p| p.level)
    }

    /// Placements in id order
    pub fn iter(&self) -> impl Iterator<Item = &NodePlacement> {
        self.placements.values()
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Smallest `(width, height)` holding the canvas and every footprint
    ///
    /// Wide hierarchical levels can overflow the configured canvas; renderers
    /// size the image with this.
    pub fn extent(&self) -> (f64, f64) {
        self.iter().fold((self.canvas.width, self.canvas.height), |(w, h), p| {
            (
                w.max(p.right() + self.canvas.padding),
                h.max(p.bottom() + self.canvas.padding),
            )
        })
    }
}

/// Lay out a pruned graph with the configured engine
///
/// **Public** - main entry point for layout
pub fn compute_layout(
    graph: &CallGraph,
    timing: &TimingTable,
    kind: LayoutKind,
    hierarchical: &HierarchicalConfig,
    force: &ForceConfig,
) -> LayoutResult {
    info!(
        "Computing {} layout for {} functions",
        kind,
        graph.node_count()
    );

    match kind {
        LayoutKind::Hierarchical => hierarchical_layout(graph, timing, hierarchical),
        LayoutKind::Force => force_layout(graph, timing, force),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canvas_validation() {
        assert!(Canvas::new(100.0, 100.0, 10.0).validate().is_ok());
        assert!(Canvas::new(20.0, 100.0, 10.0).validate().is_err());
        assert!(Canvas::new(100.0, 100.0, -1.0).validate().is_err());
        assert!(Canvas::new(f64::NAN, 100.0, 0.0).validate().is_err());
    }

    #[test]
    fn test_layout_kind_parse() {
        assert_eq!("force".parse::<LayoutKind>(), Ok(LayoutKind::Force));
        assert_eq!("Hierarchical".parse::<LayoutKind>(), Ok(LayoutKind::Hierarchical));
        assert!("radial".parse::<LayoutKind>().is_err());
    }

    #[test]
    fn test_extent_grows_with_overflow() {
        let mut layout = LayoutResult::new(LayoutKind::Hierarchical, Canvas::new(100.0, 100.0, 10.0));
        layout.insert(NodePlacement {
            id: FunctionId(0),
            x: 150.0,
            y: 50.0,
            footprint: Footprint::Box {
                width: 20.0,
                height: 20.0,
            },
            level: Some(0),
        });

        assert_eq!(layout.extent(), (170.0, 100.0));
    }
}
