//! SVG flame graph rendering and terminal summaries.
//!
//! The flame graph is drawn with the root at the bottom and callees stacked
//! above their callers. Siblings are laid out left to right, heaviest first,
//! with widths proportional to weight.

use super::tree::{FlameNodeId, FlameTree};
use crate::aggregator::{HotFunction, HotPath, SamplingClock};
use crate::output::escape_xml;
use crate::utils::error::FlamegraphError;
use colored::Colorize;
use log::info;

/// Colour groups for frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeCategory {
    /// Language runtime: scheduler, GC, syscalls
    Runtime,
    Stdlib,
    UserCode,
    Root,
}

const RUNTIME_PREFIXES: &[&str] = &["runtime.", "runtime/", "runtime::", "syscall.", "internal/"];

const STDLIB_PACKAGES: &[&str] = &[
    "bufio", "bytes", "compress", "container", "context", "crypto", "encoding", "errors", "fmt",
    "hash", "io", "math", "net", "os", "reflect", "regexp", "sort", "strconv", "strings", "sync",
    "time", "unicode", "std", "core", "alloc",
];

impl NodeCategory {
    /// Classify a frame by its function name
    pub fn from_name(name: &str) -> Self {
        if name == FlameTree::ROOT_NAME {
            return Self::Root;
        }
        if RUNTIME_PREFIXES.iter().any(|p| name.starts_with(p)) {
            return Self::Runtime;
        }

        // "math.pow", "net/http.(*Server).Serve", "std::io::Read::read"
        let package = name
            .split(['.', ':'])
            .next()
            .and_then(|p| p.split('/').next())
            .unwrap_or(name);
        if STDLIB_PACKAGES.contains(&package) {
            Self::Stdlib
        } else {
            Self::UserCode
        }
    }

    fn fill(self) -> &'static str {
        match self {
            NodeCategory::Runtime => "rgb(255, 140, 0)", // Dark Orange
            NodeCategory::Stdlib => "rgb(60, 179, 113)", // Medium Sea Green
            NodeCategory::UserCode => "rgb(220, 20, 60)", // Crimson
            NodeCategory::Root => "rgb(65, 105, 225)",   // Royal Blue
        }
    }

    fn paint(self, text: String) -> colored::ColoredString {
        match self {
            NodeCategory::Runtime => text.yellow(),
            NodeCategory::Stdlib => text.green(),
            NodeCategory::UserCode => text.red().bold(),
            NodeCategory::Root => text.blue(),
        }
    }
}

/// Flame graph configuration
#[derive(Debug, Clone)]
pub struct FlamegraphConfig {
    pub title: String,

    /// Width of the frame area, excluding side padding
    pub width: usize,
    pub frame_height: usize,
}

impl Default for FlamegraphConfig {
    fn default() -> Self {
        Self {
            title: "CPU Profile Flame Graph".to_string(),
            width: 1800,
            frame_height: 28,
        }
    }
}

impl FlamegraphConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }
}

/// Global figures printed in the flame graph header
#[derive(Debug, Clone)]
pub struct FlameStats {
    pub clock: SamplingClock,

    /// Distinct functions in the profile
    pub function_count: usize,

    /// Heaviest functions by cumulative weight
    pub hot_functions: Vec<HotFunction>,
}

const XPAD: f64 = 20.0;
const TITLE_HEIGHT: f64 = 120.0;
const LEGEND_HEIGHT: f64 = 40.0;
const HEADER_HOT_FUNCTIONS: usize = 5;

struct RenderContext<'a> {
    tree: &'a FlameTree,
    clock: &'a SamplingClock,
    output: &'a mut String,
    frame_height: f64,

    /// y of the root frame's top edge
    base_y: f64,
    total: f64,
}

/// Generate an SVG flame graph
///
/// **Public** - main entry point for flame graph rendering
///
/// # Errors
/// * `FlamegraphError::EmptyTree` - No stack was folded into the tree
pub fn generate_flamegraph(
    tree: &FlameTree,
    stats: &FlameStats,
    config: Option<&FlamegraphConfig>,
) -> Result<String, FlamegraphError> {
    if tree.is_empty() || tree.total_weight() == 0 {
        return Err(FlamegraphError::EmptyTree);
    }

    let config = config.cloned().unwrap_or_default();
    info!("Generating flame graph with {} frames", tree.len() - 1);

    let frame_height = config.frame_height as f64;
    let graph_height = (tree.max_depth() + 1) as f64 * frame_height;
    let total_width = config.width as f64 + 2.0 * XPAD;
    let total_height = TITLE_HEIGHT + graph_height + LEGEND_HEIGHT;

    let mut svg = String::new();
    svg.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>\n");
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" version="1.1" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = total_width,
        h = total_height
    ));
    svg.push_str(concat!(
        "<style>\n",
        ".title { font: bold 28px Arial, sans-serif; }\n",
        ".subtitle { font: 18px Arial, sans-serif; fill: #333; }\n",
        ".frame:hover { opacity: 0.85; stroke: black; cursor: pointer; }\n",
        ".frame-text { font: bold 14px Arial, sans-serif; fill: white; pointer-events: none; }\n",
        "</style>\n"
    ));

    render_header(&mut svg, tree, stats, &config);

    let mut ctx = RenderContext {
        tree,
        clock: &stats.clock,
        output: &mut svg,
        frame_height,
        base_y: TITLE_HEIGHT + graph_height - frame_height,
        total: tree.total_weight() as f64,
    };
    render_node(tree.root(), XPAD, config.width as f64, &mut ctx);

    render_legend(&mut svg, TITLE_HEIGHT + graph_height + 28.0);
    svg.push_str("</svg>\n");

    info!("Flame graph generated successfully ({} bytes)", svg.len());
    Ok(svg)
}

fn render_header(out: &mut String, tree: &FlameTree, stats: &FlameStats, config: &FlamegraphConfig) {
    let clock = &stats.clock;
    let rate = clock
        .sampling_rate_hz()
        .map(|hz| format!("{:.1} Hz", hz))
        .unwrap_or_else(|| "n/a".to_string());

    out.push_str(&format!(
        r#"<text x="{}" y="40" class="title">{}</text>"#,
        XPAD,
        escape_xml(&config.title)
    ));
    out.push_str(&format!(
        r#"<text x="{}" y="70" class="subtitle">Total samples: {} | Functions: {} | Total CPU time: {:.2} ms | Sampling rate: {}</text>"#,
        XPAD,
        tree.total_weight(),
        stats.function_count,
        clock.total_seconds() * 1_000.0,
        rate
    ));

    if !stats.hot_functions.is_empty() {
        let hot = stats
            .hot_functions
            .iter()
            .take(HEADER_HOT_FUNCTIONS)
            .map(|f| format!("{} ({:.1}%)", truncate_end(&f.name, 20), f.cum_percent))
            .collect::<Vec<_>>()
            .join(" | ");
        out.push_str(&format!(
            r#"<text x="{}" y="100" class="subtitle">Hot functions: {}</text>"#,
            XPAD,
            escape_xml(&hot)
        ));
    }
}

fn render_node(id: FlameNodeId, x: f64, w: f64, ctx: &mut RenderContext) {
    if w < 0.5 {
        return;
    }

    let tree = ctx.tree;
    let node = tree.node(id);
    let category = NodeCategory::from_name(&node.name);
    let y = ctx.base_y - node.depth as f64 * ctx.frame_height;
    let name = escape_xml(&node.name);

    ctx.output.push_str(&format!(
        r#"<g class="frame"><rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.0}" fill="{}" rx="3" stroke="white" stroke-width="0.8"><title>{}&#10;{} samples ({:.2}%)&#10;{:.2} ms</title></rect>"#,
        x,
        y,
        w,
        ctx.frame_height - 2.0,
        category.fill(),
        name,
        node.weight,
        100.0 * node.weight as f64 / ctx.total,
        ctx.clock.millis(node.weight)
    ));

    if let Some(label) = get_truncated_name(&node.name, w) {
        ctx.output.push_str(&format!(
            r#"<text x="{:.2}" y="{:.2}" class="frame-text">{}</text>"#,
            x + 5.0,
            y + ctx.frame_height - 9.0,
            escape_xml(&label)
        ));
    }
    ctx.output.push_str("</g>\n");

    let mut child_x = x;
    for child in tree.children(id) {
        let child_w = tree.node(child).weight as f64 / node.weight.max(1) as f64 * w;
        if child_w > 0.0 {
            render_node(child, child_x, child_w, ctx);
            child_x += child_w;
        }
    }
}

fn render_legend(out: &mut String, legend_y: f64) {
    out.push_str(&format!(
        r#"<text x="10" y="{}" font-size="14" font-weight="bold">Legend:</text>"#,
        legend_y
    ));

    let items = [
        ("User code", NodeCategory::UserCode),
        ("Standard library", NodeCategory::Stdlib),
        ("Runtime", NodeCategory::Runtime),
        ("Root", NodeCategory::Root),
    ];

    for (i, (label, category)) in items.iter().enumerate() {
        let x = 80 + i * 160;
        out.push_str(&format!(
            r#"<rect x="{}" y="{}" width="15" height="15" fill="{}" rx="2"/><text x="{}" y="{}" font-size="12">{}</text>"#,
            x,
            legend_y - 12.0,
            category.fill(),
            x + 20,
            legend_y,
            label
        ));
    }
}

/// Label for a frame of the given pixel width, or `None` if it would not fit
pub fn get_truncated_name(name: &str, width: f64) -> Option<String> {
    const MIN_LABEL_WIDTH: f64 = 35.0;
    const CHAR_WIDTH: f64 = 9.0;

    if width <= MIN_LABEL_WIDTH || name.is_empty() {
        return None;
    }

    let max_chars = (width / CHAR_WIDTH) as usize;
    if name.chars().count() <= max_chars {
        Some(name.to_string())
    } else if max_chars > 3 {
        Some(truncate_end(name, max_chars))
    } else {
        None
    }
}

/// Keep the first `max_chars - 3` characters and append an ellipsis
fn truncate_end(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Keep the last `max_chars - 3` characters behind an ellipsis
fn truncate_start(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().skip(count - max_chars.saturating_sub(3)).collect();
    format!("...{}", kept)
}

/// `pprof -top` style table plus a bar chart of the hottest paths
///
/// **Public** - terminal output for `analyze --summary` and `top`
pub fn generate_text_summary(
    functions: &[HotFunction],
    hot_paths: &[HotPath],
    total_functions: usize,
) -> String {
    let mut lines = Vec::new();

    lines.extend(render_top_table(functions, total_functions));
    if !hot_paths.is_empty() {
        lines.push(String::new());
        lines.extend(render_ascii_flamegraph(hot_paths));
    }

    lines.join("\n")
}

fn render_top_table(functions: &[HotFunction], total_functions: usize) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push(
        format!(
            "Showing top {} of {} functions",
            functions.len(),
            total_functions
        )
        .bold()
        .to_string(),
    );
    lines.push(
        format!(
            "{:>10} {:>7} {:>7} {:>10} {:>7}  {}",
            "flat", "flat%", "sum%", "cum", "cum%", "name"
        )
        .dimmed()
        .to_string(),
    );

    for f in functions {
        let category = NodeCategory::from_name(&f.name);
        lines.push(format!(
            "{:>9.2}s {:>6.2}% {:>6.2}% {:>9.2}s {:>6.2}%  {}",
            f.flat_seconds,
            f.flat_percent,
            f.sum_percent,
            f.cum_seconds,
            f.cum_percent,
            category.paint(f.name.clone())
        ));
    }

    lines
}

fn render_ascii_flamegraph(hot_paths: &[HotPath]) -> Vec<String> {
    let mut lines = vec!["Hot paths".bold().to_string()];

    for path in hot_paths.iter().take(5) {
        let bar_width = (path.percentage / 2.0).clamp(0.0, 50.0) as usize;
        let bar = "█".repeat(bar_width);
        let leaf = path.stack.split(';').next_back().unwrap_or(&path.stack);
        let category = NodeCategory::from_name(leaf);

        lines.push(format!(
            "  {} {} {:>5.1}%",
            category.paint(format!("{:<40}", truncate_start(&path.stack, 40))),
            category.paint(format!("{:<50}", bar)),
            path.percentage
        ));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(NodeCategory::from_name("root"), NodeCategory::Root);
        assert_eq!(NodeCategory::from_name("runtime.mallocgc"), NodeCategory::Runtime);
        assert_eq!(NodeCategory::from_name("math.pow"), NodeCategory::Stdlib);
        assert_eq!(NodeCategory::from_name("net/http.(*conn).serve"), NodeCategory::Stdlib);
        assert_eq!(NodeCategory::from_name("std::io::copy"), NodeCategory::Stdlib);
        assert_eq!(NodeCategory::from_name("main.compute"), NodeCategory::UserCode);
    }

    #[test]
    fn test_get_truncated_name() {
        assert_eq!(get_truncated_name("main", 30.0), None);
        assert_eq!(get_truncated_name("main", 100.0), Some("main".to_string()));
        assert_eq!(
            get_truncated_name("a_very_long_function_name", 72.0),
            Some("a_ver...".to_string())
        );
    }

    #[test]
    fn test_truncation_is_char_safe() {
        assert_eq!(truncate_end("ééééééé", 5), "éé...");
        assert_eq!(truncate_start("abcdefgh", 6), "...fgh");
    }
}
