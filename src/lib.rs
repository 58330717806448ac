//! legacy-cpuprof
//!
//! Decoder for the legacy binary CPU profile format and a resolver that
//! maps the sampled program counters back to source locations using the
//! symbol tables the Go toolchain embeds in ELF, PE and Mach-O executables.
//!
//! This crate provides the core implementation for the `cpuprof` CLI tool.
//!
//! ## Getting Started
//!
//! ```bash
//! cpuprof analyze ./server cpu.prof
//! cpuprof inspect cpu.prof
//! cpuprof symbols ./server --pc 0x401000
//! ```
//!
//! The two halves are independent: [`parser::decode`] needs no symbols and
//! [`symbols::load_symbols`] needs no profile.

pub mod aggregator;
pub mod commands;
pub mod output;
pub mod parser;
pub mod symbols;
pub mod utils;
