//! Text output for the command line.
//!
//! Only the resolved frame tuples and the summary scalars are rendered;
//! nothing is written to disk.

pub mod text;

// Re-export main functions
pub use text::{format_frame, format_stack_heading, format_summary};
