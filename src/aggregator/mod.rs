//! Aggregation of sample records into distinct stacks and summary metrics.
//!
//! This module turns the raw record sequence into:
//! - Distinct stacks with summed sample counts
//! - Summary scalars (totals, maximum, durations)
//! - The selection of hot stacks to resolve

pub mod stack_builder;
pub mod metrics;

// Re-export main types and functions
pub use stack_builder::StackAggregator;
pub use metrics::{select_stacks, summarize, ProfileSummary};
