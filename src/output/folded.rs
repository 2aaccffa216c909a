//! Folded-stack text output.
//!
//! One `outer;...;inner weight` line per distinct stack, readable by
//! `flamegraph.pl`, inferno and speedscope.

use crate::aggregator::CollapsedStack;
use crate::utils::error::OutputError;
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Render collapsed stacks as folded text
pub fn to_folded(stacks: &[CollapsedStack]) -> String {
    let mut out = String::new();
    for stack in stacks {
        out.push_str(&stack.to_line());
        out.push('\n');
    }
    out
}

/// Write collapsed stacks to a file in folded format
pub fn write_folded(stacks: &[CollapsedStack], output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!(
        "Writing {} folded stacks to: {}",
        stacks.len(),
        output_path.display()
    );

    super::prepare_output_path(output_path)?;

    let file = File::create(output_path).map_err(OutputError::WriteFailed)?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(to_folded(stacks).as_bytes())
        .map_err(OutputError::WriteFailed)?;
    writer.flush().map_err(OutputError::WriteFailed)?;

    Ok(())
}
