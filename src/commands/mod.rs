//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the decoder and the symbol resolver to perform user tasks.

pub mod analyze;
pub mod models;
pub mod utils;

// Re-export main command functions
pub use analyze::{execute_analyze, render_report, validate_args};
pub use models::{AnalyzeArgs, SymbolsArgs};
pub use utils::{describe_profile, describe_symbols, display_version, inspect_profile, parse_pc, resolve_symbols};
