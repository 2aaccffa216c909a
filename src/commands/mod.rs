//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod analyze;
pub mod models;
pub mod top;
pub mod utils;

// Re-export main command functions
pub use analyze::execute_analyze;
pub use models::{validate_args, validate_top_args, AnalyzeArgs, TopArgs};
pub use top::execute_top;
pub use utils::{display_schema, display_version, load_profile, validate_report_file};
