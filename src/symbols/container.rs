//! Extraction of the raw symbol sections from executable containers.
//!
//! Each supported container format is one [`SymbolSource`]. A source opens
//! the file, checks it is in its format, and pulls out the symbol blob, the
//! line table blob and the code section address. The file contents are read
//! into memory and the handle is closed before any parsing starts, so a
//! failed attempt leaves nothing open for the next one.

use crate::utils::config::{SectionNames, ELF_SECTIONS, MACHO_SECTIONS, PE_SECTIONS};
use crate::utils::error::ContainerError;
use log::debug;
use object::{FileKind, Object, ObjectSection};
use std::path::Path;

/// Raw symbol data pulled out of an executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolData {
    pub symtab: Vec<u8>,
    pub pclntab: Vec<u8>,
    pub text_start: u64,
}

/// A container format that may hold the symbol sections
pub trait SymbolSource {
    /// Short format label used in error messages
    fn format(&self) -> &'static str;

    /// Whether a file of `kind` belongs to this format
    fn accepts(&self, kind: FileKind) -> bool;

    /// Section names in this format
    fn sections(&self) -> SectionNames;

    /// Code section start as the line table expects it
    fn text_start(&self, _file: &object::File<'_>, text: &object::Section<'_, '_>) -> u64 {
        text.address()
    }

    /// Open `path` as this format and pull out the symbol data
    fn extract(&self, path: &Path) -> Result<SymbolData, ContainerError> {
        let format = self.format();
        let data = std::fs::read(path).map_err(|source| ContainerError::Io { format, source })?;

        let kind = FileKind::parse(&*data).map_err(|_| ContainerError::WrongFormat {
            format,
            detected: "unknown".to_string(),
        })?;
        if !self.accepts(kind) {
            return Err(ContainerError::WrongFormat {
                format,
                detected: format!("{:?}", kind),
            });
        }

        let file = object::File::parse(&*data)
            .map_err(|source| ContainerError::Parse { format, source })?;

        let names = self.sections();
        let symtab = section_data(&file, format, names.symtab)?;
        let pclntab = section_data(&file, format, names.pclntab)?;
        let text = file
            .section_by_name(names.text)
            .ok_or(ContainerError::MissingSection {
                format,
                section: names.text,
            })?;
        let text_start = self.text_start(&file, &text);

        debug!(
            "{}: {} symbol bytes, {} line table bytes, text at {:#x}",
            format,
            symtab.len(),
            pclntab.len(),
            text_start
        );

        Ok(SymbolData {
            symtab,
            pclntab,
            text_start,
        })
    }
}

/// ELF executables
#[derive(Debug, Clone, Copy, Default)]
pub struct ElfSource;

impl SymbolSource for ElfSource {
    fn format(&self) -> &'static str {
        "elf"
    }

    fn accepts(&self, kind: FileKind) -> bool {
        matches!(kind, FileKind::Elf32 | FileKind::Elf64)
    }

    fn sections(&self) -> SectionNames {
        ELF_SECTIONS
    }
}

/// PE images and COFF objects
#[derive(Debug, Clone, Copy, Default)]
pub struct PeSource;

impl SymbolSource for PeSource {
    fn format(&self) -> &'static str {
        "pe"
    }

    fn accepts(&self, kind: FileKind) -> bool {
        matches!(
            kind,
            FileKind::Pe32 | FileKind::Pe64 | FileKind::Coff | FileKind::CoffBig
        )
    }

    fn sections(&self) -> SectionNames {
        PE_SECTIONS
    }

    /// PE sections are addressed relative to the image base
    fn text_start(&self, file: &object::File<'_>, text: &object::Section<'_, '_>) -> u64 {
        text.address().wrapping_sub(file.relative_address_base())
    }
}

/// Mach-O executables
#[derive(Debug, Clone, Copy, Default)]
pub struct MachOSource;

impl SymbolSource for MachOSource {
    fn format(&self) -> &'static str {
        "mach-o"
    }

    fn accepts(&self, kind: FileKind) -> bool {
        matches!(kind, FileKind::MachO32 | FileKind::MachO64)
    }

    fn sections(&self) -> SectionNames {
        MACHO_SECTIONS
    }
}

/// Sources in the order they are tried
pub fn default_sources() -> [&'static dyn SymbolSource; 3] {
    [&ElfSource, &PeSource, &MachOSource]
}

/// Uncompressed contents of a named section
///
/// **Private** - internal helper for extract
fn section_data(
    file: &object::File<'_>,
    format: &'static str,
    name: &'static str,
) -> Result<Vec<u8>, ContainerError> {
    let section = file
        .section_by_name(name)
        .ok_or(ContainerError::MissingSection {
            format,
            section: name,
        })?;
    let data = section
        .uncompressed_data()
        .map_err(|source| ContainerError::Parse { format, source })?;
    Ok(data.into_owned())
}
