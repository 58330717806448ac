//! Analyze command implementation.
//!
//! The analyze command:
//! 1. Loads the symbol table of the executable
//! 2. Decodes the CPU profile
//! 3. Summarizes the samples
//! 4. Resolves the hottest stacks to source locations

use super::models::AnalyzeArgs;
use crate::aggregator::{select_stacks, summarize};
use crate::output::{format_frame, format_stack_heading, format_summary};
use crate::parser::{decode_file, Profile};
use crate::symbols::{load_symbols, SymbolTable};
use crate::utils::config::MAX_TOP_STACKS;
use anyhow::{Context, Result};
use log::{debug, info};
use std::time::Instant;

/// Execute the analyze command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * No symbol sections in the executable
/// * Corrupt or unreadable profile
pub fn execute_analyze(args: AnalyzeArgs) -> Result<()> {
    let start_time = Instant::now();

    info!("Step 1/3: Loading symbols from {}...", args.binary.display());
    let table = load_symbols(&args.binary)
        .with_context(|| format!("Failed to load symbols from {}", args.binary.display()))?;

    info!("Step 2/3: Decoding profile {}...", args.profile.display());
    let profile = decode_file(&args.profile)
        .with_context(|| format!("Failed to decode profile {}", args.profile.display()))?;

    info!("Step 3/3: Resolving hot stacks...");
    for line in render_report(&profile, &table, args.top) {
        println!("{}", line);
    }

    info!(
        "Analysis completed in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}

/// Build the report lines for a decoded profile
///
/// Summary scalars first, then every selected stack with one resolved
/// frame per line.
pub fn render_report(profile: &Profile, table: &SymbolTable, top: Option<usize>) -> Vec<String> {
    let summary = summarize(profile);
    debug!("{}", summary.summary());

    let mut lines = format_summary(&summary);

    for (rank, stack) in select_stacks(profile, top).iter().enumerate() {
        lines.push(String::new());
        lines.push(format_stack_heading(rank + 1, stack, profile.total_samples));

        let frames = table.resolve_stack(&stack.pcs);
        let unresolved = frames.iter().filter(|f| !f.is_resolved()).count();
        if unresolved > 0 {
            debug!("{} of {} frames unresolved", unresolved, frames.len());
        }

        lines.extend(frames.iter().map(format_frame));
    }

    lines
}

/// Validate analyze arguments
///
/// **Public** - can be called before execute_analyze for early validation
pub fn validate_args(args: &AnalyzeArgs) -> Result<()> {
    if args.binary.as_os_str().is_empty() {
        anyhow::bail!("Binary path cannot be empty");
    }

    if args.profile.as_os_str().is_empty() {
        anyhow::bail!("Profile path cannot be empty");
    }

    if let Some(top) = args.top {
        if top == 0 {
            anyhow::bail!("top must be greater than 0");
        }

        if top > MAX_TOP_STACKS {
            anyhow::bail!("top is too large (max {})", MAX_TOP_STACKS);
        }
    }

    Ok(())
}
