use super::models::SymbolsArgs;
use crate::aggregator::summarize;
use crate::output::{format_frame, format_summary};
use crate::parser::{decode_file, Profile};
use crate::symbols::{load_symbols, SymbolTable};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Decode a profile and print its layout, header and summary
pub fn inspect_profile(file_path: PathBuf) -> Result<()> {
    println!("Inspecting profile: {}", file_path.display());

    let profile = decode_file(&file_path)
        .with_context(|| format!("Failed to decode profile {}", file_path.display()))?;

    for line in describe_profile(&profile) {
        println!("{}", line);
    }

    Ok(())
}

/// Layout, header fields and summary scalars of a profile
pub fn describe_profile(profile: &Profile) -> Vec<String> {
    let mut lines = vec![
        format!("  Layout: {}", profile.layout),
        format!("  Version: {}", profile.header.version),
        format!("  Period: {:?}", profile.header.period),
        format!("  Extra header words: {:?}", profile.header.extra),
        format!(
            "  Complete: {}",
            if profile.incomplete { "no" } else { "yes" }
        ),
    ];
    lines.extend(
        format_summary(&summarize(profile))
            .into_iter()
            .map(|line| format!("  {}", line)),
    );
    lines
}

/// Load the symbols of an executable and resolve the requested addresses
pub fn resolve_symbols(args: SymbolsArgs) -> Result<()> {
    let pcs = args
        .pcs
        .iter()
        .map(|pc| parse_pc(pc))
        .collect::<Result<Vec<_>>>()?;

    let table = load_symbols(&args.binary)
        .with_context(|| format!("Failed to load symbols from {}", args.binary.display()))?;

    for line in describe_symbols(&table, &pcs) {
        println!("{}", line);
    }

    Ok(())
}

/// Table statistics followed by one resolved frame per address
pub fn describe_symbols(table: &SymbolTable, pcs: &[u64]) -> Vec<String> {
    let mut lines = vec![
        format!("  Functions: {}", table.funcs().len()),
        format!("  Symbols: {}", table.syms().len()),
    ];
    if let (Some(first), Some(last)) = (table.funcs().first(), table.funcs().last()) {
        lines.push(format!("  Text: {:#x}..{:#x}", first.entry, last.end));
    }
    lines.extend(
        pcs.iter()
            .map(|&pc| format!("{:#x} {}", pc, format_frame(&table.resolve_pc(pc)))),
    );
    lines
}

/// Parse a hex address, with or without a `0x` prefix
pub fn parse_pc(value: &str) -> Result<u64> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);

    u64::from_str_radix(digits, 16).with_context(|| format!("Invalid address: {}", value))
}

/// Display version information
pub fn display_version() {
    println!("cpuprof v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Decodes legacy CPU profiles and resolves them against Go executables.");
}
