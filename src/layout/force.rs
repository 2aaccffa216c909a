//! Spring-embedder layout (Fruchterman-Reingold).
//!
//! Nodes start at seeded pseudo-random positions. Every iteration computes
//! pairwise repulsion `k^2 / d` and edge attraction `d^2 / k` against a
//! frozen snapshot of positions, moves each node at most `temperature`, and
//! clamps it inside the padded canvas. The temperature cools geometrically.
//! Same seed and graph give bit-identical positions.

use super::{Canvas, Footprint, LayoutKind, LayoutResult, NodePlacement};
use crate::aggregator::{FunctionId, TimingTable};
use crate::graph::CallGraph;
use crate::utils::config::DEFAULT_LAYOUT_SEED;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parameters of the spring embedder
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceConfig {
    pub canvas: Canvas,
    pub seed: u64,

    /// Upper bound on iterations
    pub iterations: usize,

    /// Starting temperature as a fraction of the smaller canvas side
    pub initial_temperature: f64,

    /// Temperature multiplier per iteration
    pub cooling: f64,

    /// Stop once the temperature drops to this
    pub min_temperature: f64,

    /// Circle radius is `min_radius + radius_scale * cum / max_cum`
    pub min_radius: f64,
    pub radius_scale: f64,
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            canvas: Canvas::new(1200.0, 800.0, 40.0),
            seed: DEFAULT_LAYOUT_SEED,
            iterations: 100,
            initial_temperature: 0.1,
            cooling: 0.95,
            min_temperature: 1.0,
            min_radius: 5.0,
            radius_scale: 15.0,
        }
    }
}

impl ForceConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_canvas(mut self, width: f64, height: f64) -> Self {
        self.canvas.width = width;
        self.canvas.height = height;
        self
    }
}

/// Seeded starting positions inside the padded canvas, in node order
fn initial_positions(count: usize, canvas: &Canvas, seed: u64) -> Vec<(f64, f64)> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let x = canvas.padding + rng.gen::<f64>() * canvas.usable_width();
            let y = canvas.padding + rng.gen::<f64>() * canvas.usable_height();
            (x, y)
        })
        .collect()
}

fn clamp_to(canvas: &Canvas, (x, y): (f64, f64)) -> (f64, f64) {
    (
        x.clamp(canvas.padding, canvas.width - canvas.padding),
        y.clamp(canvas.padding, canvas.height - canvas.padding),
    )
}

/// Run the spring embedder over every node of `graph`
///
/// **Public** - force-directed layout engine
///
/// Best effort: no crossing minimisation or planarity guarantee.
pub fn force_layout(graph: &CallGraph, timing: &TimingTable, config: &ForceConfig) -> LayoutResult {
    let canvas = config.canvas;
    let mut result = LayoutResult::new(LayoutKind::Force, canvas);

    let nodes: Vec<FunctionId> = graph.nodes().into_iter().collect();
    let n = nodes.len();
    if n == 0 {
        return result;
    }

    let index: BTreeMap<FunctionId, usize> = nodes.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    let edges: Vec<(usize, usize)> = graph
        .edges()
        .filter_map(|(u, v)| Some((*index.get(&u)?, *index.get(&v)?)))
        .collect();

    let mut positions = initial_positions(n, &canvas, config.seed);

    let k = (canvas.usable_width() * canvas.usable_height() / n as f64).sqrt();
    let mut temperature = config.initial_temperature * canvas.width.min(canvas.height);
    let mut rounds = 0usize;

    while rounds < config.iterations && temperature > config.min_temperature {
        let snapshot = positions.clone();
        let mut disp = vec![(0.0f64, 0.0f64); n];

        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let dx = snapshot[i].0 - snapshot[j].0;
                let dy = snapshot[i].1 - snapshot[j].1;
                let dist = dx.hypot(dy);
                if dist > 0.0 {
                    let f = k * k / dist;
                    disp[i].0 += f * dx / dist;
                    disp[i].1 += f * dy / dist;
                }
            }
        }

        for &(u, v) in &edges {
            let dx = snapshot[u].0 - snapshot[v].0;
            let dy = snapshot[u].1 - snapshot[v].1;
            let dist = dx.hypot(dy);
            if dist > 0.0 {
                let f = dist * dist / k;
                let (fx, fy) = (f * dx / dist, f * dy / dist);
                disp[u].0 -= fx;
                disp[u].1 -= fy;
                disp[v].0 += fx;
                disp[v].1 += fy;
            }
        }

        for (i, (dx, dy)) in disp.into_iter().enumerate() {
            let len = dx.hypot(dy);
            if len > 0.0 {
                let scale = len.min(temperature) / len;
                positions[i] = clamp_to(&canvas, (snapshot[i].0 + dx * scale, snapshot[i].1 + dy * scale));
            }
        }

        temperature *= config.cooling;
        rounds += 1;
    }

    debug!(
        "Force layout settled {} nodes after {} iterations (temperature {:.2})",
        n, rounds, temperature
    );

    let max_cum = timing.max_cum_weight();
    for (id, (x, y)) in nodes.into_iter().zip(positions) {
        let share = if max_cum > 0 {
            timing.cum_weight(id) as f64 / max_cum as f64
        } else {
            0.0
        };
        result.insert(NodePlacement {
            id,
            x,
            y,
            footprint: Footprint::Circle {
                radius: config.min_radius + config.radius_scale * share,
            },
            level: None,
        });
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(n: u32) -> CallGraph {
        let mut g = CallGraph::new();
        for i in 0..n {
            g.add_edge(FunctionId(i), FunctionId((i + 1) % n));
        }
        g
    }

    #[test]
    fn test_positions_inside_canvas() {
        let config = ForceConfig::default();
        let layout = force_layout(&ring(12), &TimingTable::new(), &config);

        assert_eq!(layout.len(), 12);
        for p in layout.iter() {
            assert!(config.canvas.contains(p.x, p.y), "{:?} escaped the canvas", p);
            assert!(p.level.is_none());
        }
    }

    #[test]
    fn test_same_seed_is_bit_identical() {
        let config = ForceConfig::default().with_seed(7);
        let a = force_layout(&ring(8), &TimingTable::new(), &config);
        let b = force_layout(&ring(8), &TimingTable::new(), &config);

        for (p, q) in a.iter().zip(b.iter()) {
            assert_eq!(p.x.to_bits(), q.x.to_bits());
            assert_eq!(p.y.to_bits(), q.y.to_bits());
        }
    }

    #[test]
    fn test_zero_iterations_keeps_seeded_positions() {
        let config = ForceConfig::default().with_iterations(0);
        let layout = force_layout(&ring(3), &TimingTable::new(), &config);
        let seeded = initial_positions(3, &config.canvas, config.seed);

        for (p, (x, y)) in layout.iter().zip(seeded) {
            assert_eq!((p.x, p.y), (x, y));
        }
    }

    #[test]
    fn test_radius_scales_with_cumulative_weight() {
        use crate::aggregator::{aggregate_timing, ResolvedStack, SelfTimePolicy};
        use crate::parser::FrameOrder;

        let stacks = vec![
            ResolvedStack::new(vec![FunctionId(1), FunctionId(0)], 4, FrameOrder::LeafFirst),
            ResolvedStack::new(vec![FunctionId(0)], 4, FrameOrder::LeafFirst),
        ];
        let timing = aggregate_timing(&stacks, SelfTimePolicy::Leaf);
        let layout = force_layout(&CallGraph::from_stacks(&stacks), &timing, &ForceConfig::default());

        assert_eq!(
            layout.get(FunctionId(0)).unwrap().footprint,
            Footprint::Circle { radius: 20.0 }
        );
        assert_eq!(
            layout.get(FunctionId(1)).unwrap().footprint,
            Footprint::Circle { radius: 12.5 }
        );
    }

    #[test]
    fn test_empty_graph() {
        let layout = force_layout(&CallGraph::new(), &TimingTable::new(), &ForceConfig::default());
        assert!(layout.is_empty());
    }
}
