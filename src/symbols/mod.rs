//! Symbol resolution for Go executables.
//!
//! Program counters from a profile are resolved with the two tables the Go
//! linker embeds in every executable:
//! - the symbol blob (`.gosymtab`), empty on modern toolchains
//! - the pc/line table (`.gopclntab`), holding functions, files and lines
//!
//! Both are located by section name inside the executable container. ELF,
//! PE/COFF and Mach-O are tried in that order; the first container that
//! yields both sections and a code section wins.

pub mod container;
pub mod pclntab;
pub mod symtab;
pub mod table;

pub use container::{default_sources, ElfSource, MachOSource, PeSource, SymbolData, SymbolSource};
pub use pclntab::{LineTable, PclnVersion};
pub use symtab::Sym;
pub use table::{Func, LineInfo, ResolvedFrame, SymbolTable};

use crate::utils::error::SymbolError;
use log::{debug, info};
use std::path::Path;

/// Load the symbol table of an executable
///
/// **Public** - main entry point for symbol loading
///
/// # Errors
/// * `SymbolError::NoSymbols` - no container format yielded the sections;
///   the error lists why each one was rejected
/// * `SymbolError::LineTable` - the sections were found but could not be parsed
pub fn load_symbols(path: impl AsRef<Path>) -> Result<SymbolTable, SymbolError> {
    load_symbols_with(path, &default_sources())
}

/// Load the symbol table trying `sources` in order
pub fn load_symbols_with(
    path: impl AsRef<Path>,
    sources: &[&dyn SymbolSource],
) -> Result<SymbolTable, SymbolError> {
    let path = path.as_ref();
    let mut failures = Vec::with_capacity(sources.len());

    for source in sources {
        match source.extract(path) {
            Ok(data) => {
                info!(
                    "Loaded {} symbol sections from {}",
                    source.format(),
                    path.display()
                );
                return SymbolTable::new(&data.symtab, &data.pclntab, data.text_start).map_err(
                    |source| SymbolError::LineTable {
                        path: path.to_path_buf(),
                        source,
                    },
                );
            }
            Err(e) => {
                debug!("{}", e);
                failures.push(e);
            }
        }
    }

    Err(SymbolError::NoSymbols {
        path: path.to_path_buf(),
        failures,
    })
}
