//! Output writers for analysis results.
//!
//! This module handles writing data to disk in various formats:
//! - JSON analysis reports
//! - SVG call graphs and flame graphs
//! - Folded stack text

pub mod folded;
pub mod json;
pub mod svg;

// Re-export main functions
pub use folded::{to_folded, write_folded};
pub use json::{
    read_report, report_to_string, write_report, AnalysisReport, CallEdge, FunctionTiming,
    LayoutReport, NodePlacementReport, ReportSource,
};
pub use svg::{escape_xml, write_svg};

use crate::utils::error::OutputError;
use log::debug;
use std::path::Path;

/// Common path validation for output files
pub fn validate_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    if path.exists() && path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    Ok(())
}

/// Validate `path` and create its parent directories
pub(crate) fn prepare_output_path(path: &Path) -> Result<(), OutputError> {
    validate_path(path)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    Ok(())
}
