//! Profile decoding and the input schema.
//!
//! This module handles:
//! - Decoding pprof JSON exports
//! - Decoding folded stack text
//! - Defining the generic sample/stack model both decode into

pub mod collapsed;
pub mod pprof;
pub mod schema;

// Re-export main types
pub use collapsed::parse_collapsed;
pub use pprof::parse_pprof;
pub use schema::{FrameOrder, FunctionInfo, Line, Location, PeriodUnit, Profile, Sample, SourceFormat};

use crate::utils::error::ParseError;
use log::info;
use std::fs;
use std::path::Path;

/// Guess the input format from the file extension
///
/// `.json` is pprof JSON; anything else is treated as folded stacks.
pub fn detect_format(path: &Path) -> SourceFormat {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => SourceFormat::Pprof,
        _ => SourceFormat::Collapsed,
    }
}

/// Read and decode a profile file
///
/// **Public** - main entry point for commands
///
/// # Arguments
/// * `path` - Profile file
/// * `format` - Explicit format, or `None` to detect from the extension
/// * `default_period_ns` - Period for formats that carry none
pub fn read_profile_file(
    path: impl AsRef<Path>,
    format: Option<SourceFormat>,
    default_period_ns: u64,
) -> Result<Profile, ParseError> {
    let path = path.as_ref();
    let format = format.unwrap_or_else(|| detect_format(path));

    info!("Reading {} profile: {}", format, path.display());

    match format {
        SourceFormat::Pprof => {
            let data = fs::read(path)?;
            parse_pprof(&data)
        }
        SourceFormat::Collapsed => {
            let text = fs::read_to_string(path)?;
            parse_collapsed(&text, default_period_ns)
        }
    }
}
