//! cpuprof CLI
//!
//! Summarizes a legacy CPU profile and resolves its hottest stacks against
//! the Go executable that produced it.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use legacy_cpuprof::commands::{
    display_version, execute_analyze, inspect_profile, resolve_symbols, validate_args,
    AnalyzeArgs, SymbolsArgs,
};

/// cpuprof - legacy CPU profile analysis
#[derive(Parser, Debug)]
#[command(name = "cpuprof")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Summarize a profile and resolve its hottest stacks
    Analyze {
        /// Go executable the profile was taken from
        binary: PathBuf,

        /// Legacy CPU profile file
        profile: PathBuf,

        /// Report the top N stacks instead of those tied for the maximum
        #[arg(long, env = "CPUPROF_TOP")]
        top: Option<usize>,
    },

    /// Decode a profile and print its header and summary
    Inspect {
        /// Legacy CPU profile file
        profile: PathBuf,
    },

    /// Load the symbol table of an executable and resolve addresses
    Symbols {
        /// Go executable to load
        binary: PathBuf,

        /// Address to resolve (hex), may be repeated
        #[arg(long = "pc")]
        pcs: Vec<String>,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Analyze {
            binary,
            profile,
            top,
        } => {
            let args = AnalyzeArgs {
                binary,
                profile,
                top,
            };

            // Validate args first
            validate_args(&args)?;

            execute_analyze(args)?;
        }

        Commands::Inspect { profile } => {
            inspect_profile(profile)?;
        }

        Commands::Symbols { binary, pcs } => {
            resolve_symbols(SymbolsArgs { binary, pcs })?;
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
