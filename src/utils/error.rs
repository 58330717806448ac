//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while decoding a legacy CPU profile
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("{0}")]
    Format(String),

    #[error("failed to read profile: {0}")]
    Io(#[from] std::io::Error),
}

impl ProfileError {
    /// Shorthand for a structural violation of the profile encoding
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// True when the profile bytes themselves were malformed
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format(_))
    }
}

/// Why a single container format could not provide symbol data
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("{format}: cannot read file: {source}")]
    Io {
        format: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{format}: not a {format} file (detected {detected})")]
    WrongFormat {
        format: &'static str,
        detected: String,
    },

    #[error("{format}: malformed file: {source}")]
    Parse {
        format: &'static str,
        #[source]
        source: object::Error,
    },

    #[error("{format}: missing section {section}")]
    MissingSection {
        format: &'static str,
        section: &'static str,
    },
}

/// Errors raised while building a symbol table from raw section bytes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineTableError {
    #[error("unsupported {0}")]
    Unsupported(String),

    #[error("truncated {what} at offset {offset}")]
    Truncated { what: &'static str, offset: usize },

    #[error("bad file name index {0} in symbol table")]
    BadFileIndex(u16),
}

/// Errors that can occur while loading symbols from an executable
#[derive(Error, Debug)]
pub enum SymbolError {
    #[error("no symbols could be loaded from {path:?}\n{}", join_failures(.failures))]
    NoSymbols {
        path: PathBuf,
        failures: Vec<ContainerError>,
    },

    #[error("invalid symbol data in {path:?}: {source}")]
    LineTable {
        path: PathBuf,
        #[source]
        source: LineTableError,
    },
}

fn join_failures(failures: &[ContainerError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
