use std::path::PathBuf;

/// Arguments for the analyze command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct AnalyzeArgs {
    /// Go executable the profile was taken from
    pub binary: PathBuf,

    /// Legacy CPU profile file
    pub profile: PathBuf,

    /// Number of stacks to report (None = every stack tied for the maximum)
    pub top: Option<usize>,
}

impl Default for AnalyzeArgs {
    fn default() -> Self {
        Self {
            binary: PathBuf::new(),
            profile: PathBuf::from("cpu.prof"),
            top: None,
        }
    }
}

/// Arguments for the symbols command
#[derive(Debug, Clone, Default)]
pub struct SymbolsArgs {
    /// Go executable to load
    pub binary: PathBuf,

    /// Addresses to resolve, hex with or without `0x`
    pub pcs: Vec<String>,
}
