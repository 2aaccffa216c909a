//! SVG rendering of a laid-out call graph.
//!
//! Hierarchical layouts are drawn as boxes with flat/cum figures and edges
//! running from the callee's top edge up to the caller, labelled with the
//! caller's cumulative time. Force layouts are drawn as circles sized by
//! cumulative weight.

use super::call_graph::CallGraph;
use crate::aggregator::{FunctionInterner, SamplingClock, TimingTable};
use crate::layout::{Footprint, LayoutResult, NodePlacement};
use crate::output::escape_xml;
use crate::utils::config::HOT_NODE_PERCENT;
use log::info;

/// Everything needed to draw a call graph
#[derive(Debug, Clone, Copy)]
pub struct CallGraphView<'a> {
    pub graph: &'a CallGraph,
    pub layout: &'a LayoutResult,
    pub timing: &'a TimingTable,
    pub clock: &'a SamplingClock,
    pub interner: &'a FunctionInterner,
}

impl CallGraphView<'_> {
    fn is_hot(&self, placement: &NodePlacement) -> bool {
        self.clock.percent(self.timing.cum_weight(placement.id)) > HOT_NODE_PERCENT
    }

    fn name(&self, placement: &NodePlacement) -> &str {
        self.interner.name(placement.id)
    }
}

const BOX_STYLE: &str = concat!(
    "<style>\n",
    ".title { font: bold 16px monospace; }\n",
    ".subtitle { font: 12px monospace; fill: #666; }\n",
    ".node { fill: #ffffff; stroke: #d32f2f; stroke-width: 2px; }\n",
    ".node.hot { fill: #ffebee; stroke: #d32f2f; stroke-width: 3px; }\n",
    ".node-text { font-family: Arial; font-size: 14px; text-anchor: middle; }\n",
    ".node-package { font-family: Arial; font-size: 12px; fill: #666; text-anchor: middle; }\n",
    ".node-time { font-family: Arial; font-size: 12px; fill: #d32f2f; text-anchor: middle; }\n",
    ".edge { stroke: #d32f2f; stroke-width: 2px; fill: none; marker-end: url(#arrowhead); }\n",
    ".edge-label { font-family: Arial; font-size: 12px; fill: #d32f2f; text-anchor: middle; }\n",
    "</style>\n",
    "<defs>\n",
    "  <marker id=\"arrowhead\" viewBox=\"0 -5 10 10\" refX=\"8\" refY=\"0\" markerWidth=\"6\" markerHeight=\"6\" orient=\"auto\">\n",
    "    <path d=\"M0,-5L10,0L0,5\" fill=\"#d32f2f\"/>\n",
    "  </marker>\n",
    "</defs>\n",
);

const CIRCLE_STYLE: &str = concat!(
    "<style>\n",
    ".title { font: bold 16px monospace; }\n",
    ".subtitle { font: 12px monospace; fill: #666; }\n",
    ".node { cursor: pointer; }\n",
    ".node:hover { opacity: 0.8; }\n",
    ".node.hot circle { stroke: #b71c1c; stroke-width: 2px; }\n",
    ".node-text { font-size: 11px; font-family: monospace; pointer-events: none; text-anchor: middle; }\n",
    ".edge { stroke: #999; stroke-opacity: 0.6; stroke-width: 1.5px; marker-end: url(#arrowhead); }\n",
    ".edge:hover { stroke-opacity: 1; }\n",
    "</style>\n",
    "<defs>\n",
    "  <marker id=\"arrowhead\" viewBox=\"0 -3 6 6\" refX=\"6\" refY=\"0\" markerWidth=\"4\" markerHeight=\"4\" orient=\"auto\">\n",
    "    <path d=\"M0,-3L6,0L0,3\" fill=\"#999\"/>\n",
    "  </marker>\n",
    "</defs>\n",
);

/// Render a laid-out call graph as SVG
///
/// **Public** - main entry point for call graph rendering
///
/// An empty layout still yields a valid document with the header only.
pub fn generate_callgraph(view: &CallGraphView, title: &str) -> String {
    let (width, height) = view.layout.extent();
    let boxes = view
        .layout
        .iter()
        .next()
        .map(|p| matches!(p.footprint, Footprint::Box { .. }))
        .unwrap_or(true);

    info!(
        "Rendering call graph: {} nodes, {} edges",
        view.layout.len(),
        view.graph.edge_count()
    );

    let mut svg = String::new();
    svg.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>\n");
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" version="1.1" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}">"#,
        w = width,
        h = height
    ));
    svg.push_str(if boxes { BOX_STYLE } else { CIRCLE_STYLE });

    let padding = view.layout.canvas.padding;
    svg.push_str(&format!(
        r#"<text x="{:.0}" y="20" class="title">{}</text>"#,
        padding,
        escape_xml(title)
    ));
    svg.push_str(&format!(
        r#"<text x="{:.0}" y="35" class="subtitle">{} functions, {} edges</text>"#,
        padding,
        view.layout.len(),
        view.graph.edge_count()
    ));

    if boxes {
        render_box_edges(&mut svg, view);
        for placement in view.layout.iter() {
            render_box_node(&mut svg, view, placement);
        }
    } else {
        render_circle_edges(&mut svg, view);
        for placement in view.layout.iter() {
            render_circle_node(&mut svg, view, placement);
        }
    }

    svg.push_str("</svg>\n");
    svg
}

fn render_box_edges(out: &mut String, view: &CallGraphView) {
    for (caller, callee) in view.graph.edges() {
        let (Some(from), Some(to)) = (view.layout.get(callee), view.layout.get(caller)) else {
            continue;
        };

        let (x1, y1) = (from.x, from.top());
        let (x2, y2) = (to.x, to.bottom());
        out.push_str(&format!(
            r#"<path class="edge" d="M{:.1},{:.1} L{:.1},{:.1}"/>"#,
            x1, y1, x2, y2
        ));

        let cum = view.timing.cum_weight(caller);
        out.push_str(&format!(
            r#"<text class="edge-label" x="{:.1}" y="{:.1}">{:.2}s ({:.2}%)</text>"#,
            (x1 + x2) / 2.0,
            (y1 + y2) / 2.0 - 10.0,
            view.clock.seconds(cum),
            view.clock.percent(cum)
        ));
    }
}

fn render_box_node(out: &mut String, view: &CallGraphView, placement: &NodePlacement) {
    let Footprint::Box { width, height } = placement.footprint else {
        return;
    };
    let name = view.name(placement);
    let flat = view.timing.self_weight(placement.id);
    let cum = view.timing.cum_weight(placement.id);
    let class = if view.is_hot(placement) { "node hot" } else { "node" };
    let max_chars = (width / 8.0) as usize;

    out.push_str(&format!(
        r#"<g transform="translate({:.1},{:.1})">"#,
        placement.left(),
        placement.top()
    ));
    out.push_str(&format!(
        r#"<rect class="{}" width="{:.1}" height="{:.1}" rx="4"><title>{}</title></rect>"#,
        class,
        width,
        height,
        escape_xml(name)
    ));

    let mut text_y = 35.0;
    match name.split_once('.') {
        Some((package, function)) if !package.is_empty() && !function.is_empty() => {
            out.push_str(&format!(
                r#"<text class="node-package" x="{:.1}" y="{:.1}">{}</text>"#,
                width / 2.0,
                text_y,
                escape_xml(&shorten(package, max_chars))
            ));
            text_y += 20.0;
            out.push_str(&format!(
                r#"<text class="node-text" x="{:.1}" y="{:.1}">{}</text>"#,
                width / 2.0,
                text_y,
                escape_xml(&shorten(function, max_chars))
            ));
        }
        _ => {
            out.push_str(&format!(
                r#"<text class="node-text" x="{:.1}" y="{:.1}">{}</text>"#,
                width / 2.0,
                text_y,
                escape_xml(&shorten(name, max_chars))
            ));
        }
    }

    text_y += 25.0;
    out.push_str(&format!(
        r#"<text class="node-time" x="{:.1}" y="{:.1}">flat: {:.2}s ({:.2}%)</text>"#,
        width / 2.0,
        text_y,
        view.clock.seconds(flat),
        view.clock.percent(flat)
    ));
    text_y += 20.0;
    out.push_str(&format!(
        r#"<text class="node-time" x="{:.1}" y="{:.1}">cum: {:.2}s ({:.2}%)</text>"#,
        width / 2.0,
        text_y,
        view.clock.seconds(cum),
        view.clock.percent(cum)
    ));
    out.push_str("</g>\n");
}

fn render_circle_edges(out: &mut String, view: &CallGraphView) {
    for (caller, callee) in view.graph.edges() {
        let (Some(from), Some(to)) = (view.layout.get(caller), view.layout.get(callee)) else {
            continue;
        };

        let (dx, dy) = (to.x - from.x, to.y - from.y);
        let dist = dx.hypot(dy);
        if dist <= 0.0 {
            continue;
        }

        // stop at the callee's rim so the arrowhead stays visible
        let radius = to.footprint.half_size().0;
        out.push_str(&format!(
            r#"<line class="edge" x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}"/>"#,
            from.x,
            from.y,
            to.x - dx / dist * radius,
            to.y - dy / dist * radius
        ));
    }
}

fn render_circle_node(out: &mut String, view: &CallGraphView, placement: &NodePlacement) {
    let Footprint::Circle { radius } = placement.footprint else {
        return;
    };
    let name = view.name(placement);
    let flat = view.timing.self_weight(placement.id);
    let cum = view.timing.cum_weight(placement.id);
    let max_cum = view.timing.max_cum_weight().max(1);
    let share = cum as f64 / max_cum as f64;
    let shade = 200 - (150.0 * share) as u8;
    let class = if view.is_hot(placement) { "node hot" } else { "node" };

    out.push_str(&format!(
        r#"<g class="{}" transform="translate({:.1},{:.1})">"#,
        class, placement.x, placement.y
    ));
    out.push_str(&format!(
        r##"<circle r="{:.1}" fill="#ff{:02x}{:02x}" stroke="#fff" stroke-width="1"/>"##,
        radius, shade, shade
    ));
    out.push_str(&format!(
        "<title>{}&#10;cum: {:.2}ms ({:.1}%)&#10;flat: {:.2}ms ({:.1}%)</title>",
        escape_xml(name),
        view.clock.millis(cum),
        view.clock.percent(cum),
        view.clock.millis(flat),
        view.clock.percent(flat)
    ));
    out.push_str(&format!(
        r#"<text class="node-text" x="0" y="{:.1}">{}</text>"#,
        radius + 12.0,
        escape_xml(&shorten(name, 20))
    ));
    out.push_str("</g>\n");
}

fn shorten(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}
