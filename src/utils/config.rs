//! Configuration and constants for the decoder, the symbol loader and the CLI.

/// The first word of every legacy profile
pub const PROFILE_MAGIC: u64 = 0;

/// Header word count floor: version, period, and at least one more word
pub const MIN_HEADER_WORDS: u64 = 3;

/// Only header version understood by the decoder
pub const PROFILE_VERSION: u64 = 0;

/// Message used for every preamble/header violation
pub const CORRUPT_PROFILE: &str = "corrupt profile";

// Line table magics, one per toolchain era
pub const PCLNTAB_MAGIC_GO12: u32 = 0xffff_fffb;
pub const PCLNTAB_MAGIC_GO116: u32 = 0xffff_fffa;
pub const PCLNTAB_MAGIC_GO118: u32 = 0xffff_fff0;
pub const PCLNTAB_MAGIC_GO120: u32 = 0xffff_fff1;

// Symbol blob prefixes (Go 1.2 layout)
pub const SYMTAB_MAGIC_LE: &[u8] = &[0xfd, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00];
pub const SYMTAB_MAGIC_BE: &[u8] = &[0xff, 0xff, 0xff, 0xfd, 0x00, 0x00, 0x00];

/// Section names looked up inside one container format
#[derive(Debug, Clone, Copy)]
pub struct SectionNames {
    pub symtab: &'static str,
    pub pclntab: &'static str,
    pub text: &'static str,
}

pub const ELF_SECTIONS: SectionNames = SectionNames {
    symtab: ".gosymtab",
    pclntab: ".gopclntab",
    text: ".text",
};

pub const PE_SECTIONS: SectionNames = ELF_SECTIONS;

pub const MACHO_SECTIONS: SectionNames = SectionNames {
    symtab: "__gosymtab",
    pclntab: "__gopclntab",
    text: "__text",
};

/// Upper bound for the `--top` option
pub const MAX_TOP_STACKS: usize = 1000;
